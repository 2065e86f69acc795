//! Periodic object report announcing the BBS on the map.

use aprsbbs_protocol::{
    Frame, Identity, Latitude, Longitude, ObjectFrame, ObjectName, ObjectReport, ObjectTime,
    ProtocolError, Symbol,
};
use aprsbbs_tick::{TickConfig, TickScheduler};
use aprsbbs_transport::Connection;
use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::retry::stopped;
use crate::{BeaconConfig, Outbox};

/// Builds the object frame for one beacon, stamped with `at`.
pub fn build_beacon(
    source: &Identity,
    config: &BeaconConfig,
    at: DateTime<Utc>,
) -> Result<ObjectFrame, ProtocolError> {
    let object = ObjectReport {
        name: ObjectName::new(&config.name)?,
        live: true,
        time: ObjectTime::from_datetime(&at),
        latitude: Latitude::from_degrees(config.latitude)?,
        longitude: Longitude::from_degrees(config.longitude)?,
        symbol: Symbol::new(config.symbol_table, config.symbol_code)?,
        comment: config.comment.clone(),
    };
    Ok(ObjectFrame::new(source.clone(), object))
}

/// Sends a beacon right away and then every interval until `stop`.
///
/// With no beacon configured the scheduler is idle and the loop only
/// waits for `stop`.
pub(crate) async fn run_beacon<C: Connection>(
    outbox: Outbox<C>,
    source: Identity,
    config: Option<BeaconConfig>,
    mut stop: watch::Receiver<bool>,
) {
    let tick_config = match &config {
        Some(beacon) => TickConfig::every(beacon.interval()).immediate(),
        None => TickConfig::idle(),
    };
    let mut scheduler = TickScheduler::new(tick_config);

    loop {
        tokio::select! {
            () = stopped(&mut stop) => break,
            info = scheduler.wait_for_tick() => {
                let Some(beacon) = &config else { continue };
                let frame = match build_beacon(&source, beacon, Utc::now()) {
                    Ok(frame) => Frame::Object(frame),
                    Err(e) => {
                        warn!(error = %e, "beacon config unusable, beacon disabled");
                        break;
                    }
                };
                match outbox.send_frame(&frame).await {
                    Ok(()) => debug!(tick = info.tick, name = %beacon.name, "beacon sent"),
                    Err(e) => warn!(error = %e, "beacon send failed"),
                }
            }
        }
    }

    debug!("beacon stopped");
}
