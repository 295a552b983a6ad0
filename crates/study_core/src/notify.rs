use crate::geo::{Coordinate, nearby};
use crate::schema::{DocumentId, StoredLocation};
use std::collections::HashSet;

/// State behind location-based notifications: which location the latest
/// notification points at, and whether the user tapped it.
///
/// Created once at startup and handed to whatever needs it.
#[derive(Debug, Default)]
pub struct NotificationState {
    pending: Option<StoredLocation>,
    navigate: bool,
    announced: HashSet<DocumentId>,
}

impl NotificationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a position update. Returns the nearest location within
    /// `radius_m` that has not been announced yet, and marks it pending.
    pub fn observe_position(
        &mut self,
        position: &Coordinate,
        records: &[StoredLocation],
        radius_m: f64,
    ) -> Option<&StoredLocation> {
        let (record, distance) = nearby(records, position, radius_m)
            .into_iter()
            .find(|(record, _)| !self.announced.contains(&record.id))?;

        tracing::debug!(name = %record.location.name, distance, "announcing nearby location");
        self.announced.insert(record.id.clone());
        self.navigate = false;
        self.pending = Some(record.clone());
        self.pending.as_ref()
    }

    pub fn pending(&self) -> Option<&StoredLocation> {
        self.pending.as_ref()
    }

    /// The user tapped the notification.
    pub fn on_tap(&mut self) {
        self.navigate = self.pending.is_some();
    }

    pub fn should_navigate(&self) -> bool {
        self.navigate
    }

    /// Consume a pending navigation, if the notification was tapped.
    pub fn take_navigation(&mut self) -> Option<StoredLocation> {
        if !self.navigate {
            return None;
        }
        self.navigate = false;
        self.pending.take()
    }
}
