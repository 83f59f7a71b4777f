//! Attempt-count histograms and percentile markers for charting
//!
//! Bucket labels follow the dashboard chart's conventions exactly: small
//! domains (max < 25) are labelled by 1-based bucket index, wider ones by
//! `"lower-upper"` where every bucket but the last stops one short of the
//! next bucket's lower bound.

use serde::{Deserialize, Serialize};

use crate::error::SimError;

/// Largest value for which buckets get plain index labels
const DISCRETE_LABEL_LIMIT: u32 = 25;

/// One bar of the distribution chart
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistogramBucket {
    pub range: String,
    pub count: usize,
}

impl HistogramBucket {
    /// Inclusive `(lower, upper)` parsed from the label; a single number is both
    pub fn bounds(&self) -> Option<(u32, u32)> {
        match self.range.split_once('-') {
            Some((lower, upper)) => Some((lower.trim().parse().ok()?, upper.trim().parse().ok()?)),
            None => {
                let value = self.range.trim().parse().ok()?;
                Some((value, value))
            }
        }
    }

    pub fn contains(&self, value: u32) -> bool {
        self.bounds()
            .is_some_and(|(lower, upper)| lower <= value && value <= upper)
    }
}

/// Number of buckets to split `0..=max_attempts` into
pub fn choose_bucket_count(max_attempts: u32) -> usize {
    match max_attempts {
        m if m > 180 => 40,
        m if m > 80 => 30,
        m if m > 25 => 20,
        m => m as usize,
    }
}

/// Bin attempt counts into display buckets.
///
/// Every bucket is emitted, empty ones included, and counts always sum to
/// `attempt_counts.len()`. When all values are equal the bin width is zero
/// and everything lands in the bucket labelled with that value (the last
/// one), so the percentile marker sits on the filled bar; for wide-label
/// domains that case collapses to a single `"v-v"` bucket.
pub fn build_histogram(attempt_counts: &[u32]) -> Result<Vec<HistogramBucket>, SimError> {
    let (Some(&min), Some(&max)) = (attempt_counts.iter().min(), attempt_counts.iter().max()) else {
        return Err(SimError::EmptyInput);
    };

    if min == max && max >= DISCRETE_LABEL_LIMIT {
        return Ok(vec![HistogramBucket {
            range: format!("{min}-{max}"),
            count: attempt_counts.len(),
        }]);
    }

    let bucket_count = choose_bucket_count(max).max(1);
    let bin_size = f64::from(max - min) / bucket_count as f64;

    let mut counts = vec![0usize; bucket_count];
    for &value in attempt_counts {
        let index = if bin_size == 0.0 {
            (max as usize).min(bucket_count).saturating_sub(1)
        } else {
            (f64::from(value - min) / bin_size).floor() as usize
        };
        counts[index.min(bucket_count - 1)] += 1;
    }

    let buckets = counts
        .into_iter()
        .enumerate()
        .map(|(i, count)| HistogramBucket {
            range: bucket_label(i, bucket_count, min, max, bin_size),
            count,
        })
        .collect();

    Ok(buckets)
}

fn bucket_label(index: usize, bucket_count: usize, min: u32, max: u32, bin_size: f64) -> String {
    if max < DISCRETE_LABEL_LIMIT {
        return (index + 1).to_string();
    }

    let min = f64::from(min);
    let lower = (min + index as f64 * bin_size).floor() as u32;
    let upper = if index + 1 == bucket_count {
        max
    } else {
        ((min + (index + 1) as f64 * bin_size).floor() as u32).saturating_sub(1)
    };
    format!("{lower}-{upper}")
}

/// Bucket holding the attempt count at `percent` of the sorted runs.
///
/// Percentages outside `[1, 100]` (zero and NaN included) give `None`.
///
/// The rank is `floor(len * percent / 100)`. At 100% that is one past the
/// last run, where the dashboard chart shows no marker; here it is clamped
/// to the last run so the 100th percentile marks the bucket holding `max`.
pub fn find_percentile_point<'a>(
    sorted_attempt_counts: &[u32],
    histogram: &'a [HistogramBucket],
    percent: f64,
) -> Option<&'a HistogramBucket> {
    find_percentile_index(sorted_attempt_counts, histogram, percent).map(|i| &histogram[i])
}

/// Position of the [find_percentile_point] bucket in `histogram`.
///
/// Labels are not unique when bins are narrower than one attempt (several
/// empty `"25-24"` buckets), so callers marking a bar should go by index.
pub fn find_percentile_index(
    sorted_attempt_counts: &[u32],
    histogram: &[HistogramBucket],
    percent: f64,
) -> Option<usize> {
    if !(1.0..=100.0).contains(&percent) || sorted_attempt_counts.is_empty() {
        return None;
    }

    let index = (sorted_attempt_counts.len() as f64 * percent / 100.0).floor() as usize;
    let value = sorted_attempt_counts[index.min(sorted_attempt_counts.len() - 1)];

    histogram.iter().position(|bucket| bucket.contains(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn labels(buckets: &[HistogramBucket]) -> Vec<&str> {
        buckets.iter().map(|b| b.range.as_str()).collect()
    }

    #[test]
    fn bucket_count_thresholds() {
        assert_eq!(choose_bucket_count(200), 40);
        assert_eq!(choose_bucket_count(181), 40);
        assert_eq!(choose_bucket_count(180), 30);
        assert_eq!(choose_bucket_count(81), 30);
        assert_eq!(choose_bucket_count(80), 20);
        assert_eq!(choose_bucket_count(26), 20);
        assert_eq!(choose_bucket_count(25), 25);
        assert_eq!(choose_bucket_count(7), 7);
    }

    #[test]
    fn identical_small_values_fill_their_own_bucket() {
        let values = [5, 5, 5, 5, 5];
        let histogram = build_histogram(&values).unwrap();
        assert_eq!(labels(&histogram), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(histogram[4].count, 5);
        assert!(histogram[..4].iter().all(|b| b.count == 0));

        let marker = find_percentile_point(&values, &histogram, 50.0).unwrap();
        assert_eq!(marker.range, "5");
        assert_eq!(marker.count, 5);
    }

    #[test]
    fn percentile_index_picks_one_of_duplicate_labels() {
        let values = [25, 30];
        let histogram = build_histogram(&values).unwrap();
        assert_eq!(histogram[0].range, "25-24");
        assert_eq!(histogram[0].range, histogram[1].range);

        assert_eq!(find_percentile_index(&values, &histogram, 1.0), Some(3));
        assert_eq!(histogram[3].range, "25-25");
    }

    #[test]
    fn identical_large_values_collapse_to_one_bucket() {
        let histogram = build_histogram(&[30, 30, 30]).unwrap();
        assert_eq!(histogram.len(), 1);
        assert_eq!(histogram[0].range, "30-30");
        assert_eq!(histogram[0].count, 3);
    }

    #[test]
    fn small_domain_uses_index_labels() {
        let histogram = build_histogram(&[1, 2, 3, 4]).unwrap();
        assert_eq!(labels(&histogram), vec!["1", "2", "3", "4"]);
        assert!(histogram.iter().all(|b| b.count == 1));
    }

    #[test]
    fn wide_domain_uses_range_labels() {
        let values: Vec<u32> = (1..=200).collect();
        let histogram = build_histogram(&values).unwrap();

        assert_eq!(histogram.len(), 40);
        assert_eq!(histogram[0].range, "1-4");
        assert_eq!(histogram[1].range, "5-9");
        assert_eq!(histogram[39].range, "195-200");
        assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), 200);
    }

    #[test]
    fn empty_input_is_rejected() {
        assert!(matches!(build_histogram(&[]), Err(SimError::EmptyInput)));
    }

    #[test]
    fn bounds_parse_both_label_styles() {
        let single = HistogramBucket { range: "7".into(), count: 0 };
        let ranged = HistogramBucket { range: "10-14".into(), count: 0 };
        assert_eq!(single.bounds(), Some((7, 7)));
        assert_eq!(ranged.bounds(), Some((10, 14)));
        assert!(ranged.contains(14));
        assert!(!ranged.contains(15));
    }

    #[test]
    fn percentile_finds_matching_bucket() {
        let values: Vec<u32> = (1..=200).collect();
        let histogram = build_histogram(&values).unwrap();
        let bucket = find_percentile_point(&values, &histogram, 50.0).unwrap();
        assert_eq!(bucket.range, "100-104");

        let small = [1, 2, 3, 4];
        let histogram = build_histogram(&small).unwrap();
        assert_eq!(find_percentile_point(&small, &histogram, 50.0).unwrap().range, "3");
    }

    #[test]
    fn hundredth_percentile_reads_last_run() {
        let values: Vec<u32> = (1..=200).collect();
        let histogram = build_histogram(&values).unwrap();
        let bucket = find_percentile_point(&values, &histogram, 100.0).unwrap();
        assert_eq!(bucket.range, "195-200");
    }

    #[test]
    fn percentile_guard_rejects_out_of_range() {
        let values = [3, 4, 5];
        let histogram = build_histogram(&values).unwrap();
        assert!(find_percentile_point(&values, &histogram, 0.0).is_none());
        assert!(find_percentile_point(&values, &histogram, 101.0).is_none());
        assert!(find_percentile_point(&values, &histogram, f64::NAN).is_none());
        assert!(find_percentile_point(&[], &histogram, 50.0).is_none());
    }

    proptest! {
        #[test]
        fn bucket_counts_sum_to_input_len(values in prop::collection::vec(1u32..600, 1..300)) {
            let histogram = build_histogram(&values).unwrap();
            prop_assert_eq!(histogram.iter().map(|b| b.count).sum::<usize>(), values.len());
        }

        #[test]
        fn percentile_guard_holds(values in prop::collection::vec(1u32..600, 1..100)) {
            let mut sorted = values.clone();
            sorted.sort_unstable();
            let histogram = build_histogram(&sorted).unwrap();
            prop_assert!(find_percentile_point(&sorted, &histogram, 0.0).is_none());
            prop_assert!(find_percentile_point(&sorted, &histogram, 101.0).is_none());
        }

        #[test]
        fn wide_histograms_cover_every_value(values in prop::collection::vec(25u32..600, 1..100), percent in 1.0f64..=100.0) {
            let mut sorted = values.clone();
            sorted.sort_unstable();
            let histogram = build_histogram(&sorted).unwrap();
            prop_assert!(find_percentile_point(&sorted, &histogram, percent).is_some());
        }
    }
}
