// Greedy transfer search.
//
// One sell candidate per position held (the weakest squad member there),
// processed weakest first. Each picks the best affordable, club-legal,
// same-position replacement from a bounded shortlist. Bank and club counts
// are threaded through the loop, so every accepted move sees the state left
// by the previous one. A post-pass then filters the provisional moves and
// charges hits by final rank.
//
// This is a heuristic, not a squad-wide optimum: a replacement outside the
// shortlist is never considered.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

use crate::catalog::Position;
use crate::config::TransferConfig;
use crate::squad::ProjectedPlayer;

/// At most this many squad members may come from one club.
pub const MAX_PER_CLUB: usize = 3;

/// Slack for float noise when comparing a price against the budget.
const COST_TOLERANCE: f64 = 1e-6;

/// A recommended sale and purchase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransferProposal {
    pub sold: ProjectedPlayer,
    pub bought: ProjectedPlayer,
    /// `bought.xpts_total - sold.xpts_total`.
    pub raw_gain: f64,
    /// Raw gain less any hit charged.
    pub net_gain: f64,
    pub uses_hit: bool,
}

// ---------------------------------------------------------------------------
// Club counts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
struct ClubCounts(HashMap<u32, usize>);

impl ClubCounts {
    fn from_squad(squad: &[ProjectedPlayer]) -> Self {
        let mut counts = HashMap::new();
        for p in squad {
            *counts.entry(p.team).or_insert(0) += 1;
        }
        ClubCounts(counts)
    }

    fn count(&self, team: u32) -> usize {
        self.0.get(&team).copied().unwrap_or(0)
    }

    fn can_add(&self, team: u32) -> bool {
        self.count(team) < MAX_PER_CLUB
    }

    fn swap(&mut self, out_team: u32, in_team: u32) {
        if let Some(c) = self.0.get_mut(&out_team) {
            *c = c.saturating_sub(1);
        }
        *self.0.entry(in_team).or_insert(0) += 1;
    }
}

// ---------------------------------------------------------------------------
// Candidate selection
// ---------------------------------------------------------------------------

fn by_total_desc(a: &ProjectedPlayer, b: &ProjectedPlayer) -> Ordering {
    b.xpts_total
        .partial_cmp(&a.xpts_total)
        .unwrap_or(Ordering::Equal)
}

/// The top `size` candidates by projected horizon total.
pub fn shortlist(candidates: &[ProjectedPlayer], size: usize) -> Vec<&ProjectedPlayer> {
    let mut ranked: Vec<&ProjectedPlayer> = candidates.iter().collect();
    ranked.sort_by(|a, b| by_total_desc(a, b));
    ranked.truncate(size);
    ranked
}

/// The weakest squad member at each position held, weakest first.
pub fn sell_candidates(squad: &[ProjectedPlayer]) -> Vec<&ProjectedPlayer> {
    let mut weakest: HashMap<Position, &ProjectedPlayer> = HashMap::new();
    for p in squad {
        weakest
            .entry(p.position)
            .and_modify(|cur| {
                if p.xpts_total < cur.xpts_total {
                    *cur = p;
                }
            })
            .or_insert(p);
    }
    let mut sells: Vec<&ProjectedPlayer> = weakest.into_values().collect();
    sells.sort_by(|a, b| {
        a.xpts_total
            .partial_cmp(&b.xpts_total)
            .unwrap_or(Ordering::Equal)
            .then(a.position.cmp(&b.position))
    });
    sells
}

/// Lowest horizon total among starters at each position.
fn worst_starters(squad: &[ProjectedPlayer]) -> HashMap<Position, f64> {
    let mut out: HashMap<Position, f64> = HashMap::new();
    for p in squad.iter().filter(|p| p.starter) {
        out.entry(p.position)
            .and_modify(|w| *w = w.min(p.xpts_total))
            .or_insert(p.xpts_total);
    }
    out
}

struct Provisional<'a> {
    sold: &'a ProjectedPlayer,
    bought: &'a ProjectedPlayer,
    raw_gain: f64,
}

// ---------------------------------------------------------------------------
// Proposer
// ---------------------------------------------------------------------------

/// Propose up to `max_swaps` budget- and club-legal transfers.
///
/// `candidates` are projected players available to buy; anything already in
/// `squad` is ignored. The result is ordered by net gain, highest first, and
/// is empty when nothing clears the filters.
pub fn propose_transfers(
    squad: &[ProjectedPlayer],
    candidates: &[ProjectedPlayer],
    bank: f64,
    config: &TransferConfig,
) -> Vec<TransferProposal> {
    let pool = shortlist(candidates, config.shortlist);
    let mut owned: HashSet<u32> = squad.iter().map(|p| p.id).collect();
    let mut clubs = ClubCounts::from_squad(squad);
    let mut bank = bank;
    let mut provisional: Vec<Provisional<'_>> = Vec::new();

    for sell in sell_candidates(squad) {
        if provisional.len() >= config.max_swaps {
            break;
        }
        let budget = bank + sell.cost;

        let mut best: Option<&ProjectedPlayer> = None;
        let mut best_gain = 0.0;
        for &cand in &pool {
            if cand.position != sell.position || owned.contains(&cand.id) {
                continue;
            }
            if cand.cost > budget + COST_TOLERANCE || !clubs.can_add(cand.team) {
                continue;
            }
            let gain = cand.xpts_total - sell.xpts_total;
            if gain > best_gain + config.improvement_epsilon {
                best = Some(cand);
                best_gain = gain;
            }
        }

        let Some(buy) = best else {
            debug!(sell = %sell.name, "no affordable upgrade on the shortlist");
            continue;
        };
        if best_gain <= config.min_gain {
            debug!(sell = %sell.name, gain = best_gain, "best upgrade below minimum gain");
            continue;
        }

        // Heuristic: only disturb a bench keeper for a large gain, and never
        // with the last free transfer already spoken for.
        if sell.position.is_goalkeeper()
            && !sell.starter
            && (best_gain < config.bench_gk_min_gain
                || provisional.len() >= config.free_transfers)
        {
            debug!(
                sell = %sell.name,
                gain = best_gain,
                "skipping bench goalkeeper swap"
            );
            continue;
        }

        clubs.swap(sell.team, buy.team);
        bank += sell.cost - buy.cost;
        owned.insert(buy.id);
        debug!(
            sell = %sell.name,
            buy = %buy.name,
            gain = best_gain,
            bank,
            buy_club_count = clubs.count(buy.team),
            "provisional transfer"
        );
        provisional.push(Provisional {
            sold: sell,
            bought: buy,
            raw_gain: best_gain,
        });
    }

    let proposals = finalize(provisional, squad, config);
    info!(
        count = proposals.len(),
        "transfer search complete"
    );
    proposals
}

/// Re-rank by raw gain, apply the quality filters, then charge hits by rank.
fn finalize(
    mut provisional: Vec<Provisional<'_>>,
    squad: &[ProjectedPlayer],
    config: &TransferConfig,
) -> Vec<TransferProposal> {
    provisional.sort_by(|a, b| {
        b.raw_gain
            .partial_cmp(&a.raw_gain)
            .unwrap_or(Ordering::Equal)
    });

    let worst = worst_starters(squad);
    let surviving = provisional.into_iter().filter(|m| {
        if m.raw_gain < config.min_raw_gain {
            debug!(buy = %m.bought.name, raw = m.raw_gain, "dropped: raw gain too small");
            return false;
        }
        if m.bought.xpts_total < config.min_buy_xpts {
            debug!(buy = %m.bought.name, xpts = m.bought.xpts_total, "dropped: buy projects too low");
            return false;
        }
        if config.require_starter_upgrade {
            if let Some(&w) = worst.get(&m.bought.position) {
                if m.bought.xpts_total <= w {
                    debug!(buy = %m.bought.name, "dropped: does not beat worst starter");
                    return false;
                }
            }
        }
        true
    });

    let mut out: Vec<TransferProposal> = surviving
        .enumerate()
        .map(|(rank, m)| {
            let uses_hit = rank >= config.free_transfers;
            let hit = if uses_hit { config.hit_penalty } else { 0.0 };
            let mut bought = m.bought.clone();
            bought.starter = m.sold.starter;
            TransferProposal {
                sold: m.sold.clone(),
                bought,
                raw_gain: m.raw_gain,
                net_gain: m.raw_gain - hit,
                uses_hit,
            }
        })
        .filter(|p| p.net_gain >= config.min_net_gain && !(config.require_no_hit && p.uses_hit))
        .collect();

    out.sort_by(|a, b| {
        b.net_gain
            .partial_cmp(&a.net_gain)
            .unwrap_or(Ordering::Equal)
    });
    out
}
