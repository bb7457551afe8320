use serde::Serialize;

use crate::format::BYTES_PER_MB;

/// First-versus-last change of one byte-valued series.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Growth {
    pub first: u64,
    pub last: u64,
    pub delta: i64,
    /// `None` when the first value is zero.
    pub rate_percent: Option<f64>,
}

impl Growth {
    pub fn delta_mb(&self) -> f64 {
        self.delta as f64 / BYTES_PER_MB
    }
}

/// Growth between the first and last values. Needs at least two values.
pub fn growth(values: &[u64]) -> Option<Growth> {
    if values.len() < 2 {
        return None;
    }
    let first = *values.first()?;
    let last = *values.last()?;
    let delta = last as i64 - first as i64;
    let rate_percent = (first > 0).then(|| delta as f64 / first as f64 * 100.0);
    Some(Growth {
        first,
        last,
        delta,
        rate_percent,
    })
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Contributor {
    pub component: String,
    pub delta: i64,
}

impl Contributor {
    pub fn delta_mb(&self) -> f64 {
        self.delta as f64 / BYTES_PER_MB
    }
}

/// Ranks components by absolute change, largest first, dropping anything
/// whose change does not exceed `significance_mb`. Ties keep input order.
pub fn rank_contributors(
    components: &[(&str, Option<Growth>)],
    significance_mb: f64,
) -> Vec<Contributor> {
    let mut ranked: Vec<Contributor> = components
        .iter()
        .filter_map(|(name, growth)| {
            let change = (*growth)?;
            (change.delta_mb().abs() > significance_mb).then(|| Contributor {
                component: (*name).to_string(),
                delta: change.delta,
            })
        })
        .collect();
    ranked.sort_by_key(|c| std::cmp::Reverse(c.delta.unsigned_abs()));
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    const MB: u64 = 1024 * 1024;

    #[test]
    fn single_value_has_no_growth() {
        assert!(growth(&[5]).is_none());
        assert!(growth(&[]).is_none());
    }

    #[test]
    fn growth_uses_endpoints_only() {
        let g = growth(&[100, 5, 900, 150]).unwrap();
        assert_eq!(g.delta, 50);
        assert_eq!(g.rate_percent, Some(50.0));
    }

    #[test]
    fn zero_start_has_undefined_rate() {
        let g = growth(&[0, 10 * MB]).unwrap();
        assert_eq!(g.delta, (10 * MB) as i64);
        assert!(g.rate_percent.is_none());
    }

    #[test]
    fn shrinking_series_is_negative() {
        let g = growth(&[300 * MB, 100 * MB]).unwrap();
        assert_eq!(g.delta_mb(), -200.0);
    }

    #[test]
    fn contributors_sorted_and_filtered() {
        let grow = |d: i64| growth(&[100 * MB, (100 * MB as i64 + d) as u64]);
        let ranked = rank_contributors(
            &[
                ("Mlocked Memory", grow(5 * MB as i64)),
                ("Unreclaimable Slab", grow(-(20 * MB as i64))),
                ("Page Tables", grow(1024)),
                ("Kernel Stack", None),
            ],
            0.1,
        );
        let names: Vec<&str> = ranked.iter().map(|c| c.component.as_str()).collect();
        assert_eq!(names, vec!["Unreclaimable Slab", "Mlocked Memory"]);
    }

    #[test]
    fn equal_changes_keep_input_order() {
        let grow = |d: i64| growth(&[100 * MB, (100 * MB as i64 + d) as u64]);
        let ranked = rank_contributors(
            &[
                ("Mlocked Memory", grow(5 * MB as i64)),
                ("Unreclaimable Slab", grow(-(5 * MB as i64))),
                ("Page Tables", grow(8 * MB as i64)),
                ("Kernel Stack", grow(5 * MB as i64)),
            ],
            0.1,
        );
        let ranked: Vec<(&str, i64)> = ranked
            .iter()
            .map(|c| (c.component.as_str(), c.delta / MB as i64))
            .collect();
        assert_eq!(
            ranked,
            vec![
                ("Page Tables", 8),
                ("Mlocked Memory", 5),
                ("Unreclaimable Slab", -5),
                ("Kernel Stack", 5),
            ]
        );

        let reversed = rank_contributors(
            &[
                ("Kernel Stack", grow(5 * MB as i64)),
                ("Unreclaimable Slab", grow(-(5 * MB as i64))),
            ],
            0.1,
        );
        let names: Vec<&str> = reversed.iter().map(|c| c.component.as_str()).collect();
        assert_eq!(names, vec!["Kernel Stack", "Unreclaimable Slab"]);
    }
}
