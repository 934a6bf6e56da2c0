use voting_common::{Proposal, ProposalIndex};

/// Index of the proposal with the most votes. Ties go to the lowest index, i.e. the
/// proposal registered first. `None` when there are no proposals.
pub fn winning_proposal(proposals: &[Proposal]) -> Option<ProposalIndex> {
    let mut winner: Option<(usize, u64)> = None;
    for (index, proposal) in proposals.iter().enumerate() {
        match winner {
            // Strictly greater keeps the earlier proposal on a tie.
            Some((_, best)) if proposal.vote_count <= best => {}
            _ => winner = Some((index, proposal.vote_count)),
        }
    }
    winner.and_then(|(index, _)| ProposalIndex::try_from(index).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proposals(counts: &[u64]) -> Vec<Proposal> {
        counts
            .iter()
            .enumerate()
            .map(|(i, &vote_count)| Proposal {
                description: format!("proposal {i}"),
                vote_count,
            })
            .collect()
    }

    #[test]
    fn highest_count_wins() {
        assert_eq!(winning_proposal(&proposals(&[1, 4, 2])), Some(1));
        assert_eq!(winning_proposal(&proposals(&[0, 0, 3])), Some(2));
    }

    #[test]
    fn ties_go_to_the_first_registered_proposal() {
        assert_eq!(winning_proposal(&proposals(&[1, 1])), Some(0));
        assert_eq!(winning_proposal(&proposals(&[0, 2, 5, 5])), Some(2));
        assert_eq!(winning_proposal(&proposals(&[0, 0, 0])), Some(0));
    }

    #[test]
    fn no_proposals_no_winner() {
        assert_eq!(winning_proposal(&[]), None);
    }
}
