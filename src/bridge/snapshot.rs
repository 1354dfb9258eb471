/// Retained per-station values as last seen by the bridge.
///
/// Index is the station number; `0` is off, anything else is on. All access is
/// bounds-checked; the snapshot is resized to the controller's station count
/// before it is compared.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StationSnapshot {
    stations: Vec<i64>,
}

/// One station whose on/off value differs between two snapshots
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StationChange {
    pub station: usize,
    pub on: bool,
}

impl StationSnapshot {
    pub fn new(stations: Vec<i64>) -> Self {
        Self { stations }
    }

    pub fn as_slice(&self) -> &[i64] {
        &self.stations
    }

    /// Grows with zeros or truncates; existing indices keep their value.
    pub fn resize_to(&mut self, len: usize) {
        self.stations.resize(len, 0);
    }

    pub fn is_on(&self, station: usize) -> Option<bool> {
        self.stations.get(station).map(|v| *v != 0)
    }

    /// Sets one station to 1 or 0. Returns `false` if the index is out of range.
    pub fn set(&mut self, station: usize, on: bool) -> bool {
        match self.stations.get_mut(station) {
            Some(slot) => {
                *slot = i64::from(on);
                true
            }
            None => false,
        }
    }

    /// Resizes to `next.len()` and lists every index whose value differs.
    ///
    /// Stations that did not exist before compare against `0`, so a new
    /// station that is already running shows up as a change.
    pub fn changes_to(&mut self, next: &[i64]) -> Vec<StationChange> {
        if self.stations.len() != next.len() {
            self.resize_to(next.len());
        }

        self.stations
            .iter()
            .zip(next)
            .enumerate()
            .filter(|(_, (old, new))| old != new)
            .map(|(station, (_, new))| StationChange {
                station,
                on: *new != 0,
            })
            .collect()
    }

    /// Replaces the content with `next`, reusing the allocation.
    pub fn replace(&mut self, next: &[i64]) {
        self.stations.clear();
        self.stations.extend_from_slice(next);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn change(station: usize, on: bool) -> StationChange {
        StationChange { station, on }
    }

    #[test]
    fn equal_length_reports_only_differences() {
        let mut snapshot = StationSnapshot::new(vec![0, 1, 0, 3]);
        let changes = snapshot.changes_to(&[0, 0, 2, 3]);

        assert_eq!(changes, vec![change(1, false), change(2, true)]);
    }

    #[test]
    fn nonzero_to_other_nonzero_is_still_a_change() {
        let mut snapshot = StationSnapshot::new(vec![1]);
        assert_eq!(snapshot.changes_to(&[2]), vec![change(0, true)]);
    }

    #[test]
    fn growing_compares_new_stations_against_zero() {
        let mut snapshot = StationSnapshot::new(vec![1, 0]);
        let changes = snapshot.changes_to(&[1, 0, 0, 1]);

        assert_eq!(changes, vec![change(3, true)]);
        assert_eq!(snapshot.as_slice(), &[1, 0, 0, 0]);
    }

    #[test]
    fn shrinking_keeps_leading_stations() {
        let mut snapshot = StationSnapshot::new(vec![1, 0, 1, 1]);
        let changes = snapshot.changes_to(&[0, 0]);

        assert_eq!(changes, vec![change(0, false)]);
        assert_eq!(snapshot.as_slice(), &[1, 0]);
    }

    #[test]
    fn empty_snapshot_publishes_running_stations_only() {
        let mut snapshot = StationSnapshot::default();
        assert_eq!(snapshot.changes_to(&[0, 5, 0]), vec![change(1, true)]);
    }

    #[test]
    fn out_of_range_access_is_rejected() {
        let mut snapshot = StationSnapshot::new(vec![0, 1]);

        assert_eq!(snapshot.is_on(1), Some(true));
        assert_eq!(snapshot.is_on(2), None);
        assert!(!snapshot.set(2, true));
        assert!(snapshot.set(0, true));
        assert_eq!(snapshot.as_slice(), &[1, 1]);
    }
}
