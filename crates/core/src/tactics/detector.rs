//! Motif detection entry point

use shakmaty::Chess;
use tracing::debug;

use super::types::{Tactic, TacticCollection};
use super::{forks, king, material, rays};

/// Runs every detector on `pos` and returns the deduplicated collection.
///
/// Detectors are total: any legal position yields a (possibly empty) result.
pub fn analyze_tactics(pos: &Chess) -> TacticCollection {
    let mut found: Vec<Tactic> = Vec::new();

    found.extend(rays::find_ray_motifs(pos));
    found.extend(forks::find_forks(pos));
    found.extend(forks::find_double_check(pos));
    found.extend(material::find_hanging(pos));
    found.extend(material::find_trapped(pos));
    found.extend(material::find_defensive_duties(pos));
    found.extend(king::find_back_rank_weakness(pos));
    found.extend(king::find_exposed_king(pos));
    found.extend(king::find_mate_threats(pos));
    found.extend(king::find_mate_patterns(pos));

    let collection = TacticCollection::new(found);
    debug!(
        tactics = collection.len(),
        motifs = collection.motif_types().count(),
        "analyzed position"
    );
    collection
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_fen;
    use crate::tactics::MotifType;

    #[test]
    fn test_analysis_is_deterministic() {
        let pos = parse_fen("r1bqk2r/pppp1ppp/2n2n2/2b1p3/2B1P3/3P1N2/PPP2PPP/RNBQK2R w KQkq - 1 5").unwrap();
        assert_eq!(analyze_tactics(&pos).keys(), analyze_tactics(&pos).keys());
    }

    #[test]
    fn test_starting_position_is_quiet() {
        let found = analyze_tactics(&Chess::default());
        assert!(found.of(MotifType::Pin).is_empty());
        assert!(found.of(MotifType::Fork).is_empty());
        assert!(found.of(MotifType::HangingPiece).is_empty());
    }

    #[test]
    fn test_degenerate_positions_do_not_fail() {
        for fen in [
            // stalemate
            "7k/5Q2/6K1/8/8/8/8/8 b - - 0 1",
            // checkmate
            "R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1",
            // bare kings
            "7k/8/8/8/8/8/8/K7 w - - 0 1",
        ] {
            let pos = parse_fen(fen).unwrap();
            let _ = analyze_tactics(&pos);
        }
    }

    #[test]
    fn test_checkmate_reports_pattern() {
        let pos = parse_fen("R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 0 1").unwrap();
        let found = analyze_tactics(&pos);
        assert!(found.motif_types().any(|m| matches!(m, MotifType::MatePattern(_))));
    }
}
