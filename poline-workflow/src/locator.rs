//! Line Locator: pure lookup of a line number in fetched PO state.

use poline_core::types::{LineNumber, LineStatus, RemoteLineId, RemotePoState};

/// Result of resolving one line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Found { id: RemoteLineId, status: LineStatus },
    NotFound,
    /// More than one remote line carries the number.
    Ambiguous { count: usize },
}

impl Location {
    pub fn is_found(&self) -> bool {
        matches!(self, Location::Found { .. })
    }
}

/// Resolve `line` against `state`.
///
/// Comparison is exact on the canonical decimal text: `"1"` matches line 1,
/// `"01"`, `"1.0"` and `"10"` do not.
pub fn locate(state: &RemotePoState, line: LineNumber) -> Location {
    let wanted = line.to_string();
    let mut matches = state.order_lines.iter().filter(|l| l.line_num == wanted);
    match (matches.next(), matches.count()) {
        (None, _) => Location::NotFound,
        (Some(remote), 0) => Location::Found {
            id: RemoteLineId(remote.id.clone()),
            status: remote.status.clone(),
        },
        (Some(_), rest) => Location::Ambiguous { count: rest + 1 },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poline_core::types::RemoteLine;

    fn state(lines: &[(&str, &str, &str)]) -> RemotePoState {
        RemotePoState {
            order_lines: lines
                .iter()
                .map(|(id, num, status)| RemoteLine {
                    id: (*id).to_string(),
                    line_num: (*num).to_string(),
                    status: LineStatus::from(*status),
                })
                .collect(),
        }
    }

    #[test]
    fn finds_id_and_status() {
        let s = state(&[("501", "1", "created"), ("502", "2", "soft_closed_for_invoicing")]);
        assert_eq!(
            locate(&s, LineNumber(2)),
            Location::Found {
                id: RemoteLineId::from("502"),
                status: LineStatus::SoftClosedForInvoicing,
            }
        );
    }

    #[test]
    fn match_is_exact_not_prefix_or_padded() {
        let s = state(&[("510", "10", "created"), ("501", "01", "created")]);
        assert_eq!(locate(&s, LineNumber(1)), Location::NotFound);
        assert!(locate(&s, LineNumber(10)).is_found());
    }

    #[test]
    fn empty_state_is_not_found() {
        assert_eq!(locate(&RemotePoState::default(), LineNumber(1)), Location::NotFound);
    }

    #[test]
    fn duplicate_line_numbers_are_ambiguous() {
        let s = state(&[("1", "3", "created"), ("2", "3", "created")]);
        assert_eq!(locate(&s, LineNumber(3)), Location::Ambiguous { count: 2 });
    }
}
