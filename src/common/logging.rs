// Relay

macro_rules! log_relay_established {
    ($peer:expr, $proxy:expr, $endpoint:expr) => {
        info!(
            "relay ESTABLISHED: client [{}] <--L--> proxy [{}] <--R--> endpoint [{}]",
            $peer, $proxy, $endpoint
        );
    };
}

macro_rules! log_relay_closed {
    ($peer:expr, $proxy:expr, $endpoint:expr, $l2r:expr, $r2l:expr) => {
        info!(
            "relay CLOSED: client [{}] <--L--> proxy [{}] <--R--> endpoint [{}], transmitted: L->R {}, R->L {}",
            $peer,
            $proxy,
            $endpoint,
            human_bytes($l2r as f64),
            human_bytes($r2l as f64)
        );
    };
}

macro_rules! log_relay_closed_with_error {
    ($peer:expr, $proxy:expr, $endpoint:expr, $err:expr) => {
        warn!(
            "relay CLOSED with error: client [{}] <--L--> proxy [{}] <--R--> endpoint [{}], reason: '{}'",
            $peer, $proxy, $endpoint, $err
        );
    };
}

pub(crate) use log_relay_closed;
pub(crate) use log_relay_closed_with_error;
pub(crate) use log_relay_established;

// Connection lifecycle

macro_rules! log_conn_accepted {
    ($addr:expr) => {
        info!("connection ACCEPTED: peer '{}'", $addr)
    };
}

macro_rules! log_conn_terminated {
    ($addr:expr, $reason:expr) => {
        info!("connection TERMINATED: peer '{}', reason: {}", $addr, $reason)
    };
}

macro_rules! log_conn_terminated_with_error {
    ($addr:expr, $err:expr) => {
        warn!("connection TERMINATED with error: peer '{}', reason: '{}'", $addr, $err)
    };
}

macro_rules! log_accept_error {
    ($err:expr) => {
        warn!("TCP connection was NOT accepted: reason: '{}'", $err)
    };
}

pub(crate) use log_accept_error;
pub(crate) use log_conn_accepted;
pub(crate) use log_conn_terminated;
pub(crate) use log_conn_terminated_with_error;
