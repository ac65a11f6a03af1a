use crate::events::{ChangeEvent, EventHub, ProximityAlert};
use crate::posts::Author;
use crate::store::models::LocationRecord;
use crate::store::repositories::LocationRepository;
use crate::store::Store;
use crate::utils::now_millis;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// How close an emergency sharer has to be before nearby users are told.
pub const EMERGENCY_RADIUS_METERS: f64 = 5_000.0;

const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance between two coordinates, in meters.
pub fn haversine_meters(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    EARTH_RADIUS_METERS * c
}

/// Alert membership test. Strictly inside the radius; the boundary itself
/// does not alert.
fn within_alert_radius(distance_meters: f64) -> bool {
    distance_meters < EMERGENCY_RADIUS_METERS
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationView {
    pub user_id: String,
    pub user_name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: i64,
    pub is_emergency: bool,
}

impl From<LocationRecord> for LocationView {
    fn from(record: LocationRecord) -> Self {
        Self {
            user_id: record.user_id,
            user_name: record.user_name,
            latitude: record.latitude,
            longitude: record.longitude,
            timestamp: record.timestamp,
            is_emergency: record.is_emergency,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareLocationInput {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub is_emergency: bool,
}

#[derive(Clone)]
pub struct LocationService {
    store: Store,
    events: EventHub,
}

impl LocationService {
    pub fn new(store: Store, events: EventHub) -> Self {
        Self { store, events }
    }

    /// Publishes or refreshes the caller's shared position. When the share
    /// switches into emergency mode, everyone currently sharing within
    /// [`EMERGENCY_RADIUS_METERS`] gets a proximity alert. Staying in
    /// emergency mode across updates does not alert again.
    pub fn share(&self, author: &Author, input: ShareLocationInput) -> Result<Vec<ProximityAlert>> {
        let record = LocationRecord {
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            latitude: input.latitude,
            longitude: input.longitude,
            timestamp: now_millis(),
            is_emergency: input.is_emergency,
        };
        let (previous, others) = self.store.with_repositories(|repos| {
            let previous = repos.locations().get(&author.id)?;
            let others = repos.locations().list_except(&author.id)?;
            repos.locations().upsert(&record)?;
            Ok((previous, others))
        })?;

        let was_emergency = previous.map(|p| p.is_emergency).unwrap_or(false);
        let mut alerts = Vec::new();
        if record.is_emergency && !was_emergency {
            for other in &others {
                let distance = haversine_meters(
                    record.latitude,
                    record.longitude,
                    other.latitude,
                    other.longitude,
                );
                if within_alert_radius(distance) {
                    alerts.push(ProximityAlert {
                        user_id: other.user_id.clone(),
                        from_user_id: author.id.clone(),
                        from_user_name: author.name.clone(),
                        distance_meters: distance,
                    });
                }
            }
        }

        self.events.publish(ChangeEvent::LocationsChanged);
        for alert in &alerts {
            self.events.publish(ChangeEvent::ProximityAlert(alert.clone()));
        }
        Ok(alerts)
    }

    pub fn stop_sharing(&self, user_id: &str) -> Result<()> {
        self.store
            .with_repositories(|repos| repos.locations().delete(user_id))?;
        self.events.publish(ChangeEvent::LocationsChanged);
        Ok(())
    }

    /// Everyone else currently on the map, for the caller's view.
    pub fn list_others(&self, user_id: &str) -> Result<Vec<LocationView>> {
        let records = self
            .store
            .with_repositories(|repos| repos.locations().list_except(user_id))?;
        Ok(records.into_iter().map(LocationView::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    // Intramuros, Manila and a point roughly a kilometer north of it.
    const MANILA: (f64, f64) = (14.5995, 120.9842);
    const MANILA_NEARBY: (f64, f64) = (14.6085, 120.9842);
    // Cebu City, far outside any alert radius around Manila.
    const CEBU: (f64, f64) = (10.3157, 123.8854);

    fn setup_service() -> LocationService {
        let conn = Connection::open_in_memory().expect("in-memory db");
        let store = Store::from_connection(conn, true);
        store.ensure_migrations().expect("migrations");
        LocationService::new(store, EventHub::new())
    }

    fn author(id: &str, name: &str) -> Author {
        Author {
            id: id.into(),
            name: name.into(),
        }
    }

    fn share_input(coords: (f64, f64), is_emergency: bool) -> ShareLocationInput {
        ShareLocationInput {
            latitude: coords.0,
            longitude: coords.1,
            is_emergency,
        }
    }

    #[test]
    fn haversine_matches_known_distances() {
        assert_eq!(
            haversine_meters(MANILA.0, MANILA.1, MANILA.0, MANILA.1),
            0.0
        );

        let short = haversine_meters(MANILA.0, MANILA.1, MANILA_NEARBY.0, MANILA_NEARBY.1);
        assert!((900.0..1_100.0).contains(&short), "got {short}");

        let long = haversine_meters(MANILA.0, MANILA.1, CEBU.0, CEBU.1);
        assert!((500_000.0..650_000.0).contains(&long), "got {long}");
    }

    #[test]
    fn emergency_alerts_reach_nearby_sharers_only() {
        let service = setup_service();
        service
            .share(&author("user-ben", "Ben"), share_input(MANILA_NEARBY, false))
            .expect("ben shares");
        service
            .share(&author("user-carlos", "Carlos"), share_input(CEBU, false))
            .expect("carlos shares");

        let alerts = service
            .share(&author("user-maria", "Maria"), share_input(MANILA, true))
            .expect("maria escalates");
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].user_id, "user-ben");
        assert_eq!(alerts[0].from_user_id, "user-maria");
        assert_eq!(alerts[0].from_user_name, "Maria");
        assert!(alerts[0].distance_meters < EMERGENCY_RADIUS_METERS);
    }

    #[test]
    fn alert_radius_excludes_its_own_boundary() {
        assert!(within_alert_radius(4_999.9));
        assert!(!within_alert_radius(EMERGENCY_RADIUS_METERS));
        assert!(!within_alert_radius(5_000.1));
    }

    #[test]
    fn alerts_fire_only_on_the_transition_into_emergency() {
        let service = setup_service();
        service
            .share(&author("user-ben", "Ben"), share_input(MANILA_NEARBY, false))
            .expect("ben shares");

        let maria = author("user-maria", "Maria");
        let first = service
            .share(&maria, share_input(MANILA, true))
            .expect("first emergency share");
        assert_eq!(first.len(), 1);

        // still in emergency mode, so a position refresh stays quiet
        let refresh = service
            .share(&maria, share_input((14.5990, 120.9850), true))
            .expect("emergency refresh");
        assert!(refresh.is_empty());

        // dropping out and escalating again alerts again
        service
            .share(&maria, share_input(MANILA, false))
            .expect("back to normal");
        let second = service
            .share(&maria, share_input(MANILA, true))
            .expect("second emergency share");
        assert_eq!(second.len(), 1);
    }

    #[test]
    fn stopping_a_share_removes_it_from_the_map() {
        let service = setup_service();
        let maria = author("user-maria", "Maria");
        service
            .share(&maria, share_input(MANILA, false))
            .expect("share");
        service
            .share(&author("user-ben", "Ben"), share_input(MANILA_NEARBY, false))
            .expect("ben shares");

        let seen_by_ben = service.list_others("user-ben").expect("ben's view");
        assert_eq!(seen_by_ben.len(), 1);
        assert_eq!(seen_by_ben[0].user_id, "user-maria");
        assert!(!seen_by_ben[0].is_emergency);

        service.stop_sharing(&maria.id).expect("stop");
        assert!(service.list_others("user-ben").expect("after stop").is_empty());

        // an alert after the stop counts as a fresh transition
        let alerts = service
            .share(&maria, share_input(MANILA, true))
            .expect("fresh emergency");
        assert_eq!(alerts.len(), 1);
    }

    #[tokio::test]
    async fn sharing_publishes_map_and_alert_events() {
        let service = setup_service();
        service
            .share(&author("user-ben", "Ben"), share_input(MANILA_NEARBY, false))
            .expect("ben shares");

        let mut rx = service.events.subscribe();
        service
            .share(&author("user-maria", "Maria"), share_input(MANILA, true))
            .expect("maria escalates");

        assert!(matches!(rx.try_recv(), Ok(ChangeEvent::LocationsChanged)));
        match rx.try_recv() {
            Ok(ChangeEvent::ProximityAlert(alert)) => assert_eq!(alert.user_id, "user-ben"),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
