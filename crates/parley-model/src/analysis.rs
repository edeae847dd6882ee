// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

/// Closed enum returned by `Handler::analyze_command` (§3). Ordered
/// high-to-low by the confidence tiers the arbiter (§4.6, R2) applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Stop,
    Debug,
    ConfidentInDomainCommand,
    NonconfidentInDomainCommand,
    ConfidentInDomainFollowup,
    NonconfidentInDomainFollowup,
    OutOfDomainCommand,
}

impl AnalysisType {
    /// R2 confidence tier: higher wins. `Stop`/`Debug` are handled
    /// separately by R1 and never compared by tier.
    pub fn confidence_rank(self) -> u8 {
        match self {
            AnalysisType::Stop | AnalysisType::Debug => u8::MAX,
            AnalysisType::ConfidentInDomainCommand | AnalysisType::ConfidentInDomainFollowup => 2,
            AnalysisType::NonconfidentInDomainCommand | AnalysisType::NonconfidentInDomainFollowup => 1,
            AnalysisType::OutOfDomainCommand => 0,
        }
    }

    pub fn is_followup(self) -> bool {
        matches!(
            self,
            AnalysisType::ConfidentInDomainFollowup | AnalysisType::NonconfidentInDomainFollowup
        )
    }

    pub fn is_control(self) -> bool {
        matches!(self, AnalysisType::Stop | AnalysisType::Debug)
    }
}

/// Pure classification result of a single turn against a single handler
/// (§3, §4.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandAnalysisResult {
    #[serde(rename = "type")]
    pub analysis_type: AnalysisType,
    pub utterance: String,
    pub user_target: Option<String>,
}

impl CommandAnalysisResult {
    pub fn new(analysis_type: AnalysisType, utterance: impl Into<String>) -> Self {
        Self { analysis_type, utterance: utterance.into(), user_target: None }
    }

    pub fn out_of_domain(utterance: impl Into<String>) -> Self {
        Self::new(AnalysisType::OutOfDomainCommand, utterance)
    }
}
