// Plain-text rendering of a plan report.

use std::fmt;

use fplan_core::planner::PlanReport;
use fplan_core::squad::ProjectedPlayer;

/// Display adapter for a report.
pub struct ReportView<'a>(pub &'a PlanReport);

impl ReportView<'_> {
    fn player_line(&self, f: &mut fmt::Formatter<'_>, p: &ProjectedPlayer) -> fmt::Result {
        let r = self.0;
        writeln!(
            f,
            "   {:<20} {:<3} £{:>4.1}  GW{}:{:>5.2}  {}GW:{:>6.2}  {}",
            p.name,
            p.position,
            p.cost,
            r.gameweek,
            p.xpts(r.gameweek),
            r.horizon.len(),
            p.xpts_total,
            r.team_name(p.team)
        )
    }
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.0;
        match &r.entry_name {
            Some(name) => writeln!(f, "FPL Planner - Team {} ({name})", r.team_id)?,
            None => writeln!(f, "FPL Planner - Team {}", r.team_id)?,
        }
        write!(
            f,
            "Current GW: {} | Horizon: {} GWs | Bank: £{:.1}m | FTs: {} | Hit: -{} per extra",
            r.gameweek,
            r.horizon.len(),
            r.bank,
            r.free_transfers,
            r.hit_penalty
        )?;
        if let Some(deadline) = r.deadline {
            write!(f, " | Deadline: {}", deadline.format("%a %d %b %H:%M UTC"))?;
        }
        writeln!(f)?;
        match r.picks_gameweek {
            Some(gw) if gw != r.gameweek => {
                writeln!(f, "Squad taken from GW{gw} picks ({})", r.picks_source)?
            }
            None => writeln!(f, "Squad taken from {}", r.picks_source)?,
            _ => {}
        }

        writeln!(f, "\nStarters (sorted by GW xPts):")?;
        for p in r.starters() {
            self.player_line(f, p)?;
        }

        writeln!(f, "\nBench order (low GW xPts first):")?;
        for p in r.bench() {
            self.player_line(f, p)?;
        }

        writeln!(f, "\nCaptain suggestion:")?;
        match &r.captain {
            Some(c) => self.player_line(f, c)?,
            None => writeln!(f, "   (no starters)")?,
        }

        if !r.chips.is_empty() {
            writeln!(f, "\nChip planning signals:")?;
            for signal in &r.chips {
                writeln!(f, "   - {signal}")?;
            }
        }

        if r.transfers.is_empty() {
            writeln!(
                f,
                "\nNo positive net-EV transfer found given FTs/hit. Consider rolling."
            )?;
        } else {
            writeln!(
                f,
                "\nTransfer suggestions (xPts over horizon; raw vs net after hits):"
            )?;
            let n = r.horizon.len();
            for t in &r.transfers {
                writeln!(
                    f,
                    "   SELL  {:<20} {:<3} £{:>4.1}  {}GW:{:>6.2}",
                    t.sold.name, t.sold.position, t.sold.cost, n, t.sold.xpts_total
                )?;
                writeln!(
                    f,
                    "   BUY   {:<20} {:<3} £{:>4.1}  {}GW:{:>6.2}",
                    t.bought.name, t.bought.position, t.bought.cost, n, t.bought.xpts_total
                )?;
                let hit = if t.uses_hit { " (hit)" } else { "" };
                writeln!(
                    f,
                    "   ==> Gain: +{:.2} xPts | Net after hits: {:+.2}{}\n",
                    t.raw_gain, t.net_gain, hit
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fplan_core::catalog::Position;
    use fplan_core::chips::ChipSignal;
    use fplan_core::source::SquadStrategy;
    use fplan_core::transfers::TransferProposal;
    use std::collections::BTreeMap;

    fn player(id: u32, name: &str, position: Position, pts: f64, starter: bool) -> ProjectedPlayer {
        ProjectedPlayer {
            id,
            name: name.into(),
            position,
            team: 1,
            cost: 5.5,
            xpts_by_gw: [(3, pts), (4, pts)].into_iter().collect(),
            xpts_total: 2.0 * pts,
            starter,
        }
    }

    fn report() -> PlanReport {
        let squad = vec![
            player(1, "Striker", Position::Forward, 6.0, true),
            player(2, "Keeper", Position::Goalkeeper, 2.5, false),
        ];
        PlanReport {
            team_id: 99,
            entry_name: None,
            gameweek: 3,
            deadline: None,
            horizon: vec![3, 4],
            picks_source: SquadStrategy::PreviousGameweek,
            picks_gameweek: Some(2),
            bank: 1.5,
            free_transfers: 1,
            hit_penalty: 4.0,
            captain: Some(squad[0].clone()),
            squad,
            transfers: vec![],
            chips: vec![],
            team_names: BTreeMap::from([(1, "HOM".to_string())]),
        }
    }

    #[test]
    fn renders_sections_and_rolling_message() {
        let text = ReportView(&report()).to_string();
        assert!(text.starts_with("FPL Planner - Team 99"));
        assert!(text.contains("Bank: £1.5m"));
        assert!(text.contains("Squad taken from GW2 picks (previous gameweek)"));
        assert!(text.contains("Striker"));
        assert!(text.contains("HOM"));
        assert!(text.contains("Consider rolling"));
        assert!(!text.contains("Chip planning signals"));
    }

    #[test]
    fn renders_transfers_and_chips() {
        let mut r = report();
        let sold = player(2, "Keeper", Position::Goalkeeper, 2.5, false);
        let bought = player(7, "NewKeeper", Position::Goalkeeper, 7.0, false);
        r.transfers.push(TransferProposal {
            sold,
            bought,
            raw_gain: 9.0,
            net_gain: 5.0,
            uses_hit: true,
        });
        r.chips.push(ChipSignal::BenchBoost { bench_points: 14.0 });
        let text = ReportView(&r).to_string();
        assert!(text.contains("SELL  Keeper"));
        assert!(text.contains("BUY   NewKeeper"));
        assert!(text.contains("Gain: +9.00 xPts | Net after hits: +5.00 (hit)"));
        assert!(text.contains("Bench Boost"));
        assert!(!text.contains("Consider rolling"));
    }

    #[test]
    fn header_carries_entry_name_when_known() {
        let mut r = report();
        r.entry_name = Some("Tinkerers".into());
        let text = ReportView(&r).to_string();
        assert!(text.starts_with("FPL Planner - Team 99 (Tinkerers)\n"));
    }
}
