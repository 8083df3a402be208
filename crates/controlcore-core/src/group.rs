//! Physical and logical grouping of readings.
//!
//! Both views are recomputed from scratch on every call; reading sets are
//! small (tens to low hundreds) so there is no incremental state to keep in
//! sync. Bucket keys appear in first-seen order and items keep their input
//! order within a bucket, so a snapshot sorted newest-first yields buckets
//! sorted newest-first.
//!
//! The functions are generic over anything that borrows a [`Reading`]:
//! owned readings, references, or the `Arc<Reading>` values of a store
//! snapshot.

use std::borrow::Borrow;

use indexmap::IndexMap;

use crate::model::Reading;

/// station → controller → readings.
pub type PhysicalGroups<R> = IndexMap<String, IndexMap<String, Vec<R>>>;

/// sensor type → readings.
pub type LogicalGroups<R> = IndexMap<String, Vec<R>>;

/// Group by ownership: station, then controller.
pub fn group_by_physical<R, I>(readings: I) -> PhysicalGroups<R>
where
    R: Borrow<Reading>,
    I: IntoIterator<Item = R>,
{
    let mut grouped: PhysicalGroups<R> = IndexMap::new();

    for item in readings {
        let reading = item.borrow();
        let station = reading.station.clone();
        let controller = reading.controller.clone();
        grouped
            .entry(station)
            .or_default()
            .entry(controller)
            .or_default()
            .push(item);
    }

    grouped
}

/// Group by sensor type.
pub fn group_by_logical<R, I>(readings: I) -> LogicalGroups<R>
where
    R: Borrow<Reading>,
    I: IntoIterator<Item = R>,
{
    let mut grouped: LogicalGroups<R> = IndexMap::new();

    for item in readings {
        let sensor_type = item.borrow().sensor_type.clone();
        grouped.entry(sensor_type).or_default().push(item);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::fixtures::reading;
    use pretty_assertions::assert_eq;

    #[test]
    fn physical_grouping_nests_station_then_controller() {
        let readings = vec![
            reading("s1c1", "S1", "C1", "temp"),
            reading("s1c2", "S1", "C2", "temp"),
            reading("s2c1", "S2", "C1", "flow"),
        ];

        let grouped = group_by_physical(&readings);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped["S1"].len(), 2);
        assert_eq!(grouped["S2"].len(), 1);
        assert_eq!(grouped["S1"]["C2"][0].sensor_id, "s1c2");
        assert_eq!(
            grouped.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["S1", "S2"]
        );
    }

    #[test]
    fn logical_grouping_counts_by_type() {
        let readings = vec![
            reading("a", "S1", "C1", "temp"),
            reading("b", "S1", "C1", "temp"),
            reading("c", "S2", "C1", "flow"),
        ];

        let grouped = group_by_logical(readings.iter());
        assert_eq!(grouped["temp"].len(), 2);
        assert_eq!(grouped["flow"].len(), 1);
    }

    #[test]
    fn buckets_preserve_input_order() {
        let readings = vec![
            reading("z", "S1", "C1", "temp"),
            reading("a", "S1", "C1", "temp"),
            reading("m", "S1", "C1", "temp"),
        ];

        let logical = group_by_logical(&readings);
        let ids: Vec<&str> = logical["temp"].iter().map(|r| r.sensor_id.as_str()).collect();
        assert_eq!(ids, vec!["z", "a", "m"]);

        let physical = group_by_physical(&readings);
        let ids: Vec<&str> = physical["S1"]["C1"]
            .iter()
            .map(|r| r.sensor_id.as_str())
            .collect();
        assert_eq!(ids, vec!["z", "a", "m"]);
    }

    #[test]
    fn no_loss_or_duplication() {
        let types = ["temp", "flow", "ph", "temp", "level", "flow", "temp", ""];
        let readings: Vec<Arc<Reading>> = types
            .iter()
            .enumerate()
            .map(|(i, t)| {
                Arc::new(reading(
                    &format!("id{i}"),
                    &format!("S{}", i % 3),
                    &format!("C{}", i % 2),
                    t,
                ))
            })
            .collect();

        let logical = group_by_logical(readings.iter().cloned());
        let total: usize = logical.values().map(Vec::len).sum();
        assert_eq!(total, readings.len());

        let physical = group_by_physical(readings.iter().cloned());
        let total: usize = physical
            .values()
            .flat_map(IndexMap::values)
            .map(Vec::len)
            .sum();
        assert_eq!(total, readings.len());

        let mut ids: Vec<String> = logical
            .values()
            .flatten()
            .map(|r| r.sensor_id.clone())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), readings.len());
    }

    #[test]
    fn empty_input_gives_empty_groups() {
        let readings: Vec<Reading> = Vec::new();
        assert!(group_by_physical(&readings).is_empty());
        assert!(group_by_logical(&readings).is_empty());
    }
}
