//! Allowed status moves for applications and contracts.

use crate::database::models::{ApplicationStatus, ContractStatus};

impl ApplicationStatus {
    /// Whether the hiring business may move an application from `self` to `next`.
    pub fn can_transition_to(self, next: ApplicationStatus) -> bool {
        use ApplicationStatus::*;
        matches!(
            (self, next),
            (Pending, Reviewed | Shortlisted | Rejected | Accepted)
                | (Reviewed, Shortlisted | Rejected | Accepted)
                | (Shortlisted, Rejected | Accepted)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Accepted | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }

    /// Workers may pull out until a decision has been made.
    pub fn is_withdrawable(self) -> bool {
        !self.is_terminal()
    }
}

impl ContractStatus {
    /// Contracts start ACTIVE when an application is accepted; PENDING is
    /// only ever read back from older rows and never entered or left here.
    pub fn can_transition_to(self, next: ContractStatus) -> bool {
        use ContractStatus::*;
        matches!((self, next), (Active, Completed | Cancelled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [ApplicationStatus; 6] = [
        ApplicationStatus::Pending,
        ApplicationStatus::Reviewed,
        ApplicationStatus::Shortlisted,
        ApplicationStatus::Rejected,
        ApplicationStatus::Accepted,
        ApplicationStatus::Withdrawn,
    ];

    #[test]
    fn test_terminal_statuses_never_move() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{:?} -> {:?}", from, to);
            }
        }
    }

    #[test]
    fn test_business_cannot_withdraw_or_reset() {
        for from in ALL {
            assert!(!from.can_transition_to(ApplicationStatus::Withdrawn));
            assert!(!from.can_transition_to(ApplicationStatus::Pending));
        }
    }

    #[test]
    fn test_review_pipeline_moves_forward_only() {
        use ApplicationStatus::*;
        assert!(Pending.can_transition_to(Reviewed));
        assert!(Pending.can_transition_to(Accepted));
        assert!(Reviewed.can_transition_to(Shortlisted));
        assert!(Shortlisted.can_transition_to(Accepted));
        assert!(!Shortlisted.can_transition_to(Reviewed));
        assert!(!Reviewed.can_transition_to(Reviewed));
    }

    #[test]
    fn test_withdrawable_until_decided() {
        use ApplicationStatus::*;
        assert!(Pending.is_withdrawable());
        assert!(Shortlisted.is_withdrawable());
        assert!(!Accepted.is_withdrawable());
        assert!(!Withdrawn.is_withdrawable());
    }

    #[test]
    fn test_contract_transitions() {
        use ContractStatus::*;
        assert!(Active.can_transition_to(Completed));
        assert!(Active.can_transition_to(Cancelled));
        assert!(!Completed.can_transition_to(Active));
        assert!(!Cancelled.can_transition_to(Active));
        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Active));
        assert!(!Pending.can_transition_to(Cancelled));
        assert!(!Active.can_transition_to(Pending));
    }
}
