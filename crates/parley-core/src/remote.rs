// Copyright (c) 2024-2026 Parley Contributors
//
// SPDX-License-Identifier: Apache-2.0
//! Remote program composition (§4.4.8): when the parsed intent names an
//! executor distinct from the local principal, the formal-program handler
//! splits it into a local monitor (a paired `receive` that watches for
//! the remote side's results) and the remote program itself, to be
//! installed on the target principal.
use crate::program::ProgramAst;

/// The pair of programs a remote intent compiles to. `local_monitor` is
/// installed here (a `receive`-shaped rule watching for the remote
/// side's output); `remote` is handed to the transport layer to install
/// on `principal` (out of scope — §1 "transport/UI framing").
#[derive(Debug, Clone)]
pub struct RemoteSplit {
    pub principal: String,
    pub local_monitor: ProgramAst,
    pub remote: ProgramAst,
}

/// Split a program whose `executor` names a remote principal into its
/// local/remote halves. `ast.executor` must be `Some` — callers check
/// this before invoking (§4.4.8 only applies when the intent's executor
/// differs from self).
pub fn split_remote_program(ast: &ProgramAst) -> Option<RemoteSplit> {
    let principal = ast.executor.clone()?;

    let mut remote = ast.clone();
    remote.executor = None; // runs as a local program on the remote side
    remote.is_one_shot = false; // installed as a standing `send` rule

    let mut local_monitor = ProgramAst::new(format!("{}.receive", ast.function_name));
    local_monitor.executor = None;
    local_monitor.is_one_shot = false;
    local_monitor.device_choices = ast.device_choices.clone();
    local_monitor.filters = ast.filters.clone();

    Some(RemoteSplit { principal, local_monitor, remote })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_remote_program_has_no_split() {
        let ast = ProgramAst::new("com.xkcd.get_comic");
        assert!(split_remote_program(&ast).is_none());
    }

    #[test]
    fn remote_program_splits_into_local_and_remote_halves() {
        let ast = ProgramAst::new("com.xkcd.get_comic").remote("alice");
        let split = split_remote_program(&ast).unwrap();
        assert_eq!(split.principal, "alice");
        assert!(split.remote.executor.is_none());
        assert!(!split.remote.is_one_shot);
        assert_eq!(split.local_monitor.function_name, "com.xkcd.get_comic.receive");
        assert!(!split.local_monitor.is_one_shot);
    }
}
