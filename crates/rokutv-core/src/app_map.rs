//! Application identity mapping.
//!
//! Roku identifies applications by opaque strings ("12", "tvinput.hdmi1",
//! "dev"), while the accessory host wants small integer identifiers on its
//! input sources. [`AppIdentityMap`] derives a stable [`LocalAppId`] for every
//! application a device reports and answers lookups in both directions.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::AppMapError;

/// Remote id of the synthetic home-screen application.
pub const HOME_APP_ID: &str = "123456";
/// Display name of the synthetic home-screen application.
pub const HOME_APP_NAME: &str = "Home";
/// Kind of the synthetic home-screen application.
pub const HOME_APP_KIND: &str = "home";

/// Integer identifier exposed to the accessory host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocalAppId(pub i32);

impl LocalAppId {
    /// Derive the local id for a remote application id.
    ///
    /// 32-bit rolling hash over the UTF-16 code units: `acc * 31 + unit`,
    /// wrapping on overflow.
    pub fn from_remote_id(remote_id: &str) -> Self {
        let hash = remote_id
            .encode_utf16()
            .fold(0i32, |acc, unit| acc.wrapping_mul(31).wrapping_add(i32::from(unit)));
        Self(hash)
    }

    pub fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for LocalAppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An application record as reported by the device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawApp {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub version: String,
}

impl RawApp {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        kind: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind: kind.into(),
            version: version.into(),
        }
    }

    /// The synthetic home-screen entry.
    pub fn home() -> Self {
        Self::new(HOME_APP_ID, HOME_APP_NAME, HOME_APP_KIND, "1")
    }
}

/// An application with its derived local identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappedApplication {
    pub local_id: LocalAppId,
    pub remote_id: String,
    pub name: String,
    pub kind: String,
    pub version: String,
}

impl MappedApplication {
    fn from_raw(app: RawApp) -> Self {
        Self {
            local_id: LocalAppId::from_remote_id(&app.id),
            remote_id: app.id,
            name: app.name,
            kind: app.kind,
            version: app.version,
        }
    }

    /// Whether this is the synthetic home-screen entry.
    pub fn is_home(&self) -> bool {
        self.remote_id == HOME_APP_ID
    }
}

/// Two remote ids that hashed to the same local id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalIdCollision {
    pub local_id: LocalAppId,
    /// The entry lookups by local id resolve to.
    pub kept: String,
    /// The entry that cannot be selected by local id.
    pub shadowed: String,
}

/// Bidirectional lookup between remote application ids and local ids.
///
/// Immutable after construction. Lookups are linear scans in insertion order,
/// so when two entries share a local id the first one wins.
#[derive(Debug, Clone, Default)]
pub struct AppIdentityMap {
    apps: Vec<MappedApplication>,
    collisions: Vec<LocalIdCollision>,
}

impl AppIdentityMap {
    pub fn new(apps: impl IntoIterator<Item = RawApp>) -> Self {
        let apps: Vec<MappedApplication> =
            apps.into_iter().map(MappedApplication::from_raw).collect();

        let mut first_seen: HashMap<LocalAppId, &str> = HashMap::new();
        let mut collisions = Vec::new();
        for app in &apps {
            match first_seen.get(&app.local_id) {
                Some(kept) if *kept != app.remote_id => {
                    tracing::warn!(
                        local_id = %app.local_id,
                        kept = %kept,
                        shadowed = %app.remote_id,
                        "Local id collision, app cannot be selected by identifier"
                    );
                    collisions.push(LocalIdCollision {
                        local_id: app.local_id,
                        kept: kept.to_string(),
                        shadowed: app.remote_id.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    first_seen.insert(app.local_id, &app.remote_id);
                }
            }
        }

        Self { apps, collisions }
    }

    pub fn by_remote_id(&self, remote_id: &str) -> Result<&MappedApplication, AppMapError> {
        self.apps
            .iter()
            .find(|app| app.remote_id == remote_id)
            .ok_or_else(|| AppMapError::RemoteIdNotFound(remote_id.to_string()))
    }

    pub fn by_local_id(&self, local_id: LocalAppId) -> Result<&MappedApplication, AppMapError> {
        self.apps
            .iter()
            .find(|app| app.local_id == local_id)
            .ok_or(AppMapError::LocalIdNotFound(local_id))
    }

    /// All applications in the order the device reported them.
    pub fn all(&self) -> &[MappedApplication] {
        &self.apps
    }

    /// The home-screen pseudo-app, if it was injected.
    pub fn home(&self) -> Option<&MappedApplication> {
        self.apps.iter().find(|app| app.is_home())
    }

    /// Local id of the home-screen pseudo-app.
    ///
    /// Falls back to the hash of [`HOME_APP_ID`] when the pseudo-app was not
    /// injected, so callers always have something to publish.
    pub fn home_local_id(&self) -> LocalAppId {
        self.home()
            .map(|app| app.local_id)
            .unwrap_or_else(|| LocalAppId::from_remote_id(HOME_APP_ID))
    }

    pub fn collisions(&self) -> &[LocalIdCollision] {
        &self.collisions
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_apps() -> Vec<RawApp> {
        vec![
            RawApp::new("12", "Netflix", "appl", "4.1.218"),
            RawApp::new("13", "Prime Video", "appl", "14.3.2"),
            RawApp::new("tvinput.hdmi1", "HDMI 1", "tvin", "1.0.0"),
            RawApp::home(),
        ]
    }

    #[test]
    fn test_hash_matches_rolling_hash() {
        assert_eq!(LocalAppId::from_remote_id(""), LocalAppId(0));
        assert_eq!(LocalAppId::from_remote_id("12"), LocalAppId(49 * 31 + 50));
        assert_eq!(LocalAppId::from_remote_id("123456"), LocalAppId(1_450_575_459));
    }

    #[test]
    fn test_hash_wraps_on_overflow() {
        let long_id = "com.example.some.really.long.channel.identifier";
        let id = LocalAppId::from_remote_id(long_id);
        assert_eq!(id, LocalAppId::from_remote_id(long_id));
    }

    #[test]
    fn test_round_trip_every_entry() {
        let map = AppIdentityMap::new(sample_apps());
        for app in map.all() {
            let by_remote = map.by_remote_id(&app.remote_id).unwrap();
            let by_local = map.by_local_id(by_remote.local_id).unwrap();
            assert_eq!(by_remote.local_id, by_local.local_id);
        }
    }

    #[test]
    fn test_insertion_order_preserved() {
        let map = AppIdentityMap::new(sample_apps());
        let names: Vec<&str> = map.all().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Netflix", "Prime Video", "HDMI 1", "Home"]);
    }

    #[test]
    fn test_not_found() {
        let map = AppIdentityMap::new(sample_apps());
        assert_eq!(
            map.by_remote_id("999").unwrap_err(),
            AppMapError::RemoteIdNotFound("999".to_string())
        );
        assert_eq!(
            map.by_local_id(LocalAppId(7)).unwrap_err(),
            AppMapError::LocalIdNotFound(LocalAppId(7))
        );
    }

    #[test]
    fn test_collision_first_match_wins() {
        // "Aa" and "BB" share a rolling hash.
        assert_eq!(LocalAppId::from_remote_id("Aa"), LocalAppId::from_remote_id("BB"));

        let map = AppIdentityMap::new(vec![
            RawApp::new("Aa", "First", "appl", "1"),
            RawApp::new("BB", "Second", "appl", "1"),
        ]);

        let local_id = LocalAppId::from_remote_id("Aa");
        assert_eq!(map.by_local_id(local_id).unwrap().name, "First");
        assert_eq!(map.by_remote_id("BB").unwrap().name, "Second");
        assert_eq!(map.collisions().len(), 1);
        assert_eq!(map.collisions()[0].shadowed, "BB");
    }

    #[test]
    fn test_home_local_id_without_pseudo_app() {
        let map = AppIdentityMap::new(vec![RawApp::new("12", "Netflix", "appl", "1")]);
        assert!(map.home().is_none());
        assert_eq!(map.home_local_id(), LocalAppId::from_remote_id(HOME_APP_ID));
    }
}
