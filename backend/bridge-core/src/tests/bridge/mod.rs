mod liveness;
mod outbound;
mod reconnect;
