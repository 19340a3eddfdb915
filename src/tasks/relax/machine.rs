/* ********************************************************************** **
**  This file is part of msim.                                            **
**                                                                        **
**  msim is free software: you can redistribute it and/or modify it under **
**  the terms of the GNU General Public License as published by the Free  **
**  Software Foundation, either version 3 of the License, or (at your     **
**  option) any later version.                                            **
**                                                                        **
**      http://www.gnu.org/licenses/                                      **
**                                                                        **
** Do note that, while the whole of msim is licensed under the GPL, many  **
** parts of it are licensed under more permissive terms.                  **
** ********************************************************************** */

//! The decisions of the relaxation loop, without any of its side effects.

use crate::FailResult;
use crate::relax::StatusCode;
use msim_tasks_config::WarningPolicy;

#[derive(Serialize)]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RelaxState {
    Init,
    /// `index` counts solver runs in this driver call, starting from 0.
    Running { index: u32 },
    Stopped(StatusCode),
    Converged,
}

/// What the driver should do after a run has been classified.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Request {
    /// Archive the outputs, then report back through `on_archived`.
    Archive,
    /// The machine has reached a terminal state.
    Halt,
}

#[derive(Debug, Clone)]
pub struct RelaxMachine {
    max_iterations: u32,
    warning_policy: WarningPolicy,
    state: RelaxState,
}

impl RelaxMachine {
    pub fn new(max_iterations: u32, warning_policy: WarningPolicy) -> FailResult<Self> {
        ensure!(max_iterations >= 1, "max_iterations must be at least 1");
        Ok(RelaxMachine { max_iterations, warning_policy, state: RelaxState::Init })
    }

    pub fn state(&self) -> RelaxState { self.state }

    pub fn is_terminal(&self) -> bool {
        match self.state {
            RelaxState::Stopped(_) | RelaxState::Converged => true,
            RelaxState::Init | RelaxState::Running { .. } => false,
        }
    }

    /// The status reported to callers. Only meaningful once terminal.
    pub fn status(&self) -> StatusCode {
        match self.state {
            RelaxState::Stopped(status) => status,
            _ => StatusCode::Success,
        }
    }

    pub fn start(&mut self) {
        match self.state {
            RelaxState::Init => self.state = RelaxState::Running { index: 0 },
            state => panic!("(BUG!) start() called in state {:?}", state),
        }
    }

    pub fn on_status(&mut self, status: StatusCode) -> Request {
        self.running_index("on_status");

        let status = match (status, self.warning_policy) {
            (StatusCode::Warning, WarningPolicy::Continue) => StatusCode::Success,
            (status, _) => status,
        };
        match status {
            StatusCode::Error |
            StatusCode::NbandsMismatch |
            StatusCode::Warning => {
                self.state = RelaxState::Stopped(status);
                Request::Halt
            },
            StatusCode::Success if self.max_iterations == 1 => {
                self.state = RelaxState::Stopped(StatusCode::Success);
                Request::Halt
            },
            StatusCode::Success => Request::Archive,
        }
    }

    /// Whether `on_archived` should be given a convergence result.
    ///
    /// True from the second run of this driver call onwards.
    pub fn wants_convergence(&self) -> bool {
        match self.state {
            RelaxState::Running { index } => index >= 1,
            _ => false,
        }
    }

    pub fn on_archived(&mut self, converged: Option<bool>) {
        let index = self.running_index("on_archived");
        self.state = match converged {
            Some(true) => RelaxState::Converged,
            _ if index + 1 < self.max_iterations => RelaxState::Running { index: index + 1 },
            _ => RelaxState::Stopped(StatusCode::Success),
        };
    }

    fn running_index(&self, method: &str) -> u32 {
        match self.state {
            RelaxState::Running { index } => index,
            state => panic!("(BUG!) {}() called in state {:?}", method, state),
        }
    }
}
