// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! The handler arbiter (§2 C6, §4.6): picks the winning handler for a
//! turn out of every handler's `analyze_command` result, applying R1-R5
//! in order as cumulative predicates.
use parley_model::{AnalysisType, CommandAnalysisResult};

/// One handler's analysis for the current turn, plus the bookkeeping the
/// arbiter needs to break ties (§4.6 R4).
#[derive(Debug, Clone)]
pub struct HandlerCandidate {
    pub unique_id: String,
    pub priority: i32,
    pub is_current: bool,
    pub analysis: CommandAnalysisResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// R1: a `STOP` analysis from any handler cancels the session.
    Stop,
    /// R1: a `DEBUG` analysis from the named handler dumps loop state.
    Debug(String),
    /// R2-R4 selected this handler as the turn's winner.
    Handler(String),
    /// R5: nobody reported better than `OUT_OF_DOMAIN_COMMAND`.
    NoMatch,
}

/// Apply §4.6 R1-R5 to this turn's candidates, in the listed order.
pub fn arbitrate(candidates: &[HandlerCandidate]) -> Decision {
    if candidates.iter().any(|c| c.analysis.analysis_type == AnalysisType::Stop) {
        return Decision::Stop;
    }
    if let Some(c) = candidates.iter().find(|c| c.analysis.analysis_type == AnalysisType::Debug) {
        return Decision::Debug(c.unique_id.clone());
    }

    let mut best: Option<&HandlerCandidate> = None;
    for candidate in candidates {
        // R3: a FOLLOWUP analysis only counts when reported by the current handler.
        if candidate.analysis.analysis_type.is_followup() && !candidate.is_current {
            continue;
        }
        let rank = candidate.analysis.analysis_type.confidence_rank();
        if rank == 0 {
            // OUT_OF_DOMAIN never wins a slot; R5 handles the "nobody better" case.
            continue;
        }
        best = Some(match best {
            None => candidate,
            Some(current_best) => pick_better(current_best, candidate),
        });
    }

    match best {
        Some(c) => Decision::Handler(c.unique_id.clone()),
        None => Decision::NoMatch,
    }
}

/// R4 tie-break, applied only when `challenger`'s confidence rank is equal
/// to `incumbent`'s (a strictly higher rank is decided by the caller's
/// fold before this is reached). `incumbent` is the earlier-seen
/// candidate, so it already represents "first-reporter" when every other
/// tiebreaker is equal.
fn pick_better<'a>(incumbent: &'a HandlerCandidate, challenger: &'a HandlerCandidate) -> &'a HandlerCandidate {
    let incumbent_rank = incumbent.analysis.analysis_type.confidence_rank();
    let challenger_rank = challenger.analysis.analysis_type.confidence_rank();
    if challenger_rank != incumbent_rank {
        return if challenger_rank > incumbent_rank { challenger } else { incumbent };
    }
    if challenger.priority != incumbent.priority {
        return if challenger.priority > incumbent.priority { challenger } else { incumbent };
    }
    if challenger.is_current && !incumbent.is_current {
        return challenger;
    }
    // priority tie, neither (or both, which can't happen — only one
    // handler is current) favoured by currency: first-reporter wins.
    incumbent
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str, priority: i32, is_current: bool, analysis_type: AnalysisType) -> HandlerCandidate {
        HandlerCandidate { unique_id: id.into(), priority, is_current, analysis: CommandAnalysisResult::new(analysis_type, "u") }
    }

    #[test]
    fn stop_wins_regardless_of_other_candidates() {
        let candidates = vec![
            candidate("faq", 10, false, AnalysisType::ConfidentInDomainCommand),
            candidate("formal", 0, false, AnalysisType::Stop),
        ];
        assert_eq!(arbitrate(&candidates), Decision::Stop);
    }

    #[test]
    fn debug_wins_over_confident_command() {
        let candidates = vec![
            candidate("faq", 10, false, AnalysisType::ConfidentInDomainCommand),
            candidate("formal", 0, false, AnalysisType::Debug),
        ];
        assert_eq!(arbitrate(&candidates), Decision::Debug("formal".into()));
    }

    #[test]
    fn higher_confidence_tier_wins() {
        let candidates = vec![
            candidate("faq", 0, false, AnalysisType::NonconfidentInDomainCommand),
            candidate("formal", 0, false, AnalysisType::ConfidentInDomainCommand),
        ];
        assert_eq!(arbitrate(&candidates), Decision::Handler("formal".into()));
    }

    #[test]
    fn followup_from_non_current_handler_is_ignored() {
        let candidates = vec![
            candidate("faq", 0, false, AnalysisType::ConfidentInDomainFollowup),
            candidate("formal", 0, true, AnalysisType::NonconfidentInDomainCommand),
        ];
        assert_eq!(arbitrate(&candidates), Decision::Handler("formal".into()));
    }

    #[test]
    fn followup_from_current_handler_is_eligible() {
        let candidates = vec![candidate("formal", 0, true, AnalysisType::ConfidentInDomainFollowup)];
        assert_eq!(arbitrate(&candidates), Decision::Handler("formal".into()));
    }

    #[test]
    fn equal_confidence_higher_priority_wins() {
        let candidates = vec![
            candidate("faq", 5, false, AnalysisType::ConfidentInDomainCommand),
            candidate("formal", 10, false, AnalysisType::ConfidentInDomainCommand),
        ];
        assert_eq!(arbitrate(&candidates), Decision::Handler("formal".into()));
    }

    #[test]
    fn equal_confidence_and_priority_current_handler_wins() {
        let candidates = vec![
            candidate("faq", 5, false, AnalysisType::ConfidentInDomainCommand),
            candidate("formal", 5, true, AnalysisType::ConfidentInDomainCommand),
        ];
        assert_eq!(arbitrate(&candidates), Decision::Handler("formal".into()));
    }

    #[test]
    fn equal_confidence_priority_and_currency_first_reporter_wins() {
        let candidates = vec![
            candidate("faq", 5, false, AnalysisType::ConfidentInDomainCommand),
            candidate("skill", 5, false, AnalysisType::ConfidentInDomainCommand),
        ];
        assert_eq!(arbitrate(&candidates), Decision::Handler("faq".into()));
    }

    #[test]
    fn nobody_better_than_out_of_domain_is_no_match() {
        let candidates = vec![candidate("faq", 0, false, AnalysisType::OutOfDomainCommand)];
        assert_eq!(arbitrate(&candidates), Decision::NoMatch);
    }

    #[test]
    fn empty_candidate_list_is_no_match() {
        assert_eq!(arbitrate(&[]), Decision::NoMatch);
    }
}
