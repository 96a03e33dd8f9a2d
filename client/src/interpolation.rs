//! Blending of snapshots into render-ready views

use crate::history::Sample;
use shared::{interpolate_direction, lerp, FieldValue, Snapshot, DIRECTION_KEY};
use std::collections::{BTreeMap, HashMap};

/// Flat, already-interpolated state of one object as the renderer sees it
#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: u32,
    pub fields: BTreeMap<String, FieldValue>,
}

impl EntityView {
    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(FieldValue::as_f64)
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(FieldValue::as_str)
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.number("x")?, self.number("y")?))
    }
}

/// Static and dynamic fields merged with no blending
pub fn flatten(snapshot: &Snapshot) -> EntityView {
    let mut fields = snapshot.static_fields.clone();
    for (key, value) in &snapshot.dynamic_fields {
        fields.insert(key.clone(), FieldValue::Number(*value));
    }
    EntityView {
        id: snapshot.id,
        fields,
    }
}

/// Blends `a` toward `b` by `ratio`.
///
/// Static fields always come from `a`. Each dynamic field of `a` is blended
/// against the same key in `b`; keys `b` lacks keep `a`'s value. With no `b`
/// this is `flatten(a)`.
pub fn interpolate(a: &Snapshot, b: Option<&Snapshot>, ratio: f64) -> EntityView {
    let Some(b) = b else {
        return flatten(a);
    };

    let mut fields = a.static_fields.clone();
    for (key, &start) in &a.dynamic_fields {
        let value = match b.dynamic_fields.get(key) {
            Some(&end) if key == DIRECTION_KEY => interpolate_direction(start, end, ratio),
            Some(&end) => lerp(start, end, ratio),
            None => start,
        };
        fields.insert(key.clone(), FieldValue::Number(value));
    }

    EntityView { id: a.id, fields }
}

/// Interpolates every object of `a` against its counterpart in `b`, matched by id.
///
/// Objects only present in `b` are left out until they show up in an older
/// frame, so newcomers never blend against missing history.
pub fn interpolate_array(a: &[Snapshot], b: &[Snapshot], ratio: f64) -> Vec<EntityView> {
    let by_id: HashMap<u32, &Snapshot> = b.iter().map(|s| (s.id, s)).collect();
    a.iter()
        .map(|snapshot| interpolate(snapshot, by_id.get(&snapshot.id).copied(), ratio))
        .collect()
}

/// Renders a history sample of a single object
pub fn view_of(sample: Sample<'_, Snapshot>) -> EntityView {
    match sample {
        Sample::Latest(snapshot) => flatten(snapshot),
        Sample::Between {
            before,
            after,
            ratio,
        } => interpolate(before, Some(after), ratio),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::EntityUpdate;
    use std::f64::consts::PI;

    fn snapshot(id: u32, t: u64, x: f64, y: f64, direction: f64, color: &str) -> Snapshot {
        Snapshot::from_update(
            &EntityUpdate::new(id)
                .with_static("color", color)
                .with_dynamic("x", x)
                .with_dynamic("y", y)
                .with_dynamic(DIRECTION_KEY, direction),
            t,
        )
    }

    #[test]
    fn test_flatten_merges_fields() {
        let view = flatten(&snapshot(1, 100, 4.0, 5.0, 0.5, "red"));
        assert_eq!(view.id, 1);
        assert_eq!(view.text("color"), Some("red"));
        assert_eq!(view.position(), Some((4.0, 5.0)));
        assert_eq!(view.number(DIRECTION_KEY), Some(0.5));
    }

    #[test]
    fn test_interpolate_midpoint() {
        let a = snapshot(1, 100, 0.0, 10.0, 0.0, "red");
        let b = snapshot(1, 200, 10.0, 30.0, 1.0, "blue");
        let view = interpolate(&a, Some(&b), 0.5);
        let (x, y) = view.position().unwrap();
        assert_approx_eq!(x, 5.0, 1e-9);
        assert_approx_eq!(y, 20.0, 1e-9);
        assert_approx_eq!(view.number(DIRECTION_KEY).unwrap(), 0.5, 1e-9);
        assert_eq!(view.text("color"), Some("red"));
    }

    #[test]
    fn test_interpolate_boundaries_match_endpoints() {
        let a = snapshot(1, 100, -3.0, 7.0, 2.0, "red");
        let b = snapshot(1, 200, 9.0, -1.0, -2.5, "blue");

        assert_eq!(interpolate(&a, Some(&b), 0.0), flatten(&a));

        let end = interpolate(&a, Some(&b), 1.0);
        let target = flatten(&b);
        for key in ["x", "y"] {
            assert_approx_eq!(end.number(key).unwrap(), target.number(key).unwrap(), 1e-9);
        }
        assert_approx_eq!(
            end.number(DIRECTION_KEY).unwrap(),
            target.number(DIRECTION_KEY).unwrap(),
            1e-9
        );
        assert_eq!(end.text("color"), Some("red"));
    }

    #[test]
    fn test_wrapped_direction_reaches_target_at_full_ratio() {
        let a = snapshot(1, 100, 0.0, 0.0, 3.0, "red");
        let b = snapshot(1, 200, 0.0, 0.0, -3.0, "red");
        let end = interpolate(&a, Some(&b), 1.0);
        assert_approx_eq!(
            end.number(DIRECTION_KEY).unwrap(),
            flatten(&b).number(DIRECTION_KEY).unwrap(),
            1e-9
        );
    }

    #[test]
    fn test_interpolate_without_target_is_flatten() {
        let a = snapshot(3, 100, 1.0, 2.0, 0.0, "green");
        assert_eq!(interpolate(&a, None, 0.7), flatten(&a));
    }

    #[test]
    fn test_interpolate_direction_takes_short_arc() {
        let a = snapshot(1, 100, 0.0, 0.0, 3.0, "red");
        let b = snapshot(1, 200, 0.0, 0.0, -3.0, "red");
        let direction = interpolate(&a, Some(&b), 0.5).number(DIRECTION_KEY).unwrap();
        assert!(direction.abs() > 3.0);
        assert_approx_eq!(direction.abs(), PI, 1e-6);
    }

    #[test]
    fn test_missing_dynamic_key_in_target_keeps_start() {
        let a = snapshot(1, 100, 2.0, 2.0, 0.0, "red");
        let mut b = snapshot(1, 200, 4.0, 4.0, 0.0, "red");
        b.dynamic_fields.remove("y");
        let view = interpolate(&a, Some(&b), 0.5);
        assert_approx_eq!(view.number("x").unwrap(), 3.0, 1e-9);
        assert_approx_eq!(view.number("y").unwrap(), 2.0, 1e-9);
    }

    #[test]
    fn test_interpolate_array_matches_by_id() {
        let a = vec![
            snapshot(1, 100, 0.0, 0.0, 0.0, "red"),
            snapshot(2, 100, 100.0, 0.0, 0.0, "red"),
        ];
        let b = vec![
            snapshot(3, 200, 50.0, 50.0, 0.0, "red"),
            snapshot(1, 200, 10.0, 0.0, 0.0, "red"),
        ];

        let views = interpolate_array(&a, &b, 0.5);
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].id, 1);
        assert_approx_eq!(views[0].number("x").unwrap(), 5.0, 1e-9);
        // id 2 left, passes through unchanged
        assert_eq!(views[1], flatten(&a[1]));
        // id 3 only exists in the newer frame
        assert!(views.iter().all(|v| v.id != 3));
    }
}
