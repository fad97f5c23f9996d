//! Scoring aggregation for a tasting session.
//!
//! Pure functions over the session's host entries and guest score rows.
//! Nothing is cached; results are recomputed for every request.

use std::collections::HashMap;

use crate::storage::{SessionGuest, TastingEntry};

/// Name used for a guest row whose guest record is missing.
const UNKNOWN_GUEST: &str = "Guest";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestScore {
    pub guest_id: String,
    pub guest_name: String,
    pub total_score: i64,
}

/// Aggregate for one host entry.
///
/// `average` is 0 when `contributors` is 0; check the count before treating
/// the average as a real score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WineResult {
    pub entry_id: String,
    pub label: String,
    pub host_score: Option<i64>,
    pub average: i64,
    pub contributors: u32,
    pub guest_scores: Vec<GuestScore>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuestResult {
    pub guest_id: String,
    pub guest_name: String,
    pub average: i64,
    pub scored: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Superlatives {
    pub top_wine_entry_id: Option<String>,
    pub most_generous_guest_id: Option<String>,
    /// Only set when more than one guest scored.
    pub harshest_critic_guest_id: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionResults {
    pub wines: Vec<WineResult>,
    pub guests: Vec<GuestResult>,
    pub superlatives: Superlatives,
}

/// Arithmetic mean rounded half up. Zero values yield 0.
#[allow(clippy::cast_possible_wrap)]
pub const fn rounded_mean(sum: i64, count: u32) -> i64 {
    if count == 0 {
        return 0;
    }
    let n = count as i64;
    (2 * sum + n) / (2 * n)
}

/// Compute per-wine and per-guest averages plus superlatives.
///
/// `hosts` must be in display order; ties resolve to the earlier item.
/// Guest rows with no total score, or whose parent is not among `hosts`,
/// do not contribute.
pub fn aggregate(
    hosts: &[TastingEntry],
    guest_rows: &[TastingEntry],
    guests: &[SessionGuest],
) -> SessionResults {
    let names: HashMap<&str, &str> = guests
        .iter()
        .map(|g| (g.id.as_str(), g.display_name.as_str()))
        .collect();
    let name_of = |id: &str| names.get(id).copied().unwrap_or(UNKNOWN_GUEST).to_string();

    let mut by_parent: HashMap<&str, Vec<&TastingEntry>> = HashMap::new();
    for row in guest_rows {
        if let (Some(parent), Some(_)) = (row.parent_entry_id.as_deref(), row.guest_id.as_deref())
        {
            by_parent.entry(parent).or_default().push(row);
        }
    }

    let mut guest_totals: HashMap<&str, (i64, u32)> = HashMap::new();
    let mut wines = Vec::with_capacity(hosts.len());

    for host in hosts {
        let mut sum = 0;
        let mut contributors = 0u32;
        if let Some(score) = host.total_score {
            sum += score;
            contributors += 1;
        }

        let mut guest_scores = Vec::new();
        for row in by_parent.get(host.id.as_str()).into_iter().flatten() {
            let (Some(guest_id), Some(score)) = (row.guest_id.as_deref(), row.total_score) else {
                continue;
            };
            sum += score;
            contributors += 1;

            let totals = guest_totals.entry(guest_id).or_insert((0, 0));
            totals.0 += score;
            totals.1 += 1;

            guest_scores.push(GuestScore {
                guest_id: guest_id.to_string(),
                guest_name: name_of(guest_id),
                total_score: score,
            });
        }

        wines.push(WineResult {
            entry_id: host.id.clone(),
            label: host.label(),
            host_score: host.total_score,
            average: rounded_mean(sum, contributors),
            contributors,
            guest_scores,
        });
    }

    // Known guests in join order, then any stray ids in first-seen order.
    let mut guest_order: Vec<&str> = guests.iter().map(|g| g.id.as_str()).collect();
    for id in guest_rows.iter().filter_map(|r| r.guest_id.as_deref()) {
        if !guest_order.contains(&id) {
            guest_order.push(id);
        }
    }

    let guest_results: Vec<GuestResult> = guest_order
        .into_iter()
        .filter_map(|id| {
            let (sum, scored) = guest_totals.get(id).copied()?;
            Some(GuestResult {
                guest_id: id.to_string(),
                guest_name: name_of(id),
                average: rounded_mean(sum, scored),
                scored,
            })
        })
        .collect();

    let superlatives = superlatives(&wines, &guest_results);
    SessionResults {
        wines,
        guests: guest_results,
        superlatives,
    }
}

fn superlatives(wines: &[WineResult], guests: &[GuestResult]) -> Superlatives {
    let mut top: Option<&WineResult> = None;
    for wine in wines.iter().filter(|w| w.contributors > 0) {
        if top.is_none_or(|t| wine.average > t.average) {
            top = Some(wine);
        }
    }

    let mut generous: Option<&GuestResult> = None;
    let mut harshest: Option<&GuestResult> = None;
    for guest in guests {
        if generous.is_none_or(|g| guest.average > g.average) {
            generous = Some(guest);
        }
        // Ties go to the later guest.
        if harshest.is_none_or(|h| guest.average <= h.average) {
            harshest = Some(guest);
        }
    }

    Superlatives {
        top_wine_entry_id: top.map(|w| w.entry_id.clone()),
        most_generous_guest_id: generous.map(|g| g.guest_id.clone()),
        harshest_critic_guest_id: if guests.len() > 1 {
            harshest.map(|g| g.guest_id.clone())
        } else {
            None
        },
    }
}
