//! Penalty distribution engine.
//!
//! A day's total penalty (the sum of its active bad-habit taps) is split
//! across the active habits so that the per-habit effective totals always sum
//! exactly to `max(0, raw_total - penalty)`. The split is an even one with a
//! deterministic lexicographic tie-break, each share capped at the habit's own
//! raw units, and any share a capped habit could not absorb flows to habits
//! that still can.
//!
//! The function is pure: identical inputs yield identical outputs regardless
//! of the iteration order of the input map.

use std::collections::HashMap;

/// Split `total_penalty` across `habit_ids` and return each habit's effective
/// (penalty-adjusted) unit count.
///
/// Guarantees, for the returned map `eff` restricted to `habit_ids`:
/// - conservation: `sum(eff) == max(0, raw_total - total_penalty)` when
///   `raw_total == sum(raw over habit_ids)`
/// - bounds: `0 <= eff[h] <= raw[h]` for every habit
/// - fairness: shares differ by at most one unit between habits that can
///   absorb them, remainder going to lexicographically smaller ids
///
/// Habits missing from `raw_by_habit` are treated as having zero raw units.
pub fn distribute(
    raw_by_habit: &HashMap<String, u32>,
    raw_total: u32,
    total_penalty: u32,
    habit_ids: &[String],
) -> HashMap<String, u32> {
    if total_penalty == 0 || habit_ids.is_empty() {
        return raw_by_habit.clone();
    }

    // More penalty than units just zeroes the day out.
    let actual_penalty = total_penalty.min(raw_total);

    // Fixed processing order so remainder allocation is deterministic.
    let mut sorted: Vec<&String> = habit_ids.iter().collect();
    sorted.sort();

    let n = sorted.len() as u32;
    let base = actual_penalty / n;
    let remainder = actual_penalty % n;

    let raw = |id: &String| raw_by_habit.get(id).copied().unwrap_or(0);

    // Even split, one extra unit to the first `remainder` ids, capped at each
    // habit's own raw units.
    let mut shares: Vec<u32> = sorted
        .iter()
        .enumerate()
        .map(|(i, id)| {
            let want = base + u32::from((i as u32) < remainder);
            want.min(raw(*id))
        })
        .collect();

    // Capping may leave part of the penalty unassigned; hand it out one unit
    // at a time to habits with headroom. Reachable because
    // actual_penalty <= raw_total.
    let mut unallocated = actual_penalty - shares.iter().sum::<u32>();
    while unallocated > 0 {
        let mut progressed = false;
        for (i, id) in sorted.iter().enumerate() {
            if unallocated == 0 {
                break;
            }
            if shares[i] < raw(*id) {
                shares[i] += 1;
                unallocated -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    sorted
        .into_iter()
        .zip(shares)
        .map(|(id, share)| (id.clone(), raw(id) - share))
        .collect()
}
