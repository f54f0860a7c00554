//! Bitmap slot helpers shared by the opcode constructors

use crate::decode::node::BindSlot;

/// Board dimensions used by the 2D position slots
pub const BOARD_ROWS: usize = 5;
pub const BOARD_COLS: u32 = 6;

/// Decode a bind-target bitmap; a missing slot means "random"
pub fn bind_slots(bits: Option<i32>) -> Vec<BindSlot> {
    let Some(bits) = bits else {
        return vec![BindSlot::Random];
    };
    let mut targets = Vec::new();
    if bits & 1 != 0 {
        targets.push(BindSlot::OwnLeader);
    }
    if bits & 2 != 0 {
        if targets.is_empty() {
            targets.push(BindSlot::FriendLeader);
        } else {
            targets = vec![BindSlot::BothLeaders];
        }
    }
    if bits & 4 != 0 {
        targets.push(BindSlot::Subs);
    }
    targets
}

/// 1-based positions of every set bit
pub fn positions(bits: i32) -> Vec<i32> {
    if bits <= 0 {
        return Vec::new();
    }
    (0..32)
        .filter(|i| (bits >> i) & 1 == 1)
        .map(|i| i + 1)
        .collect()
}

/// Typing bitmap; `-1` means "no types"
pub fn typings(bits: Option<i32>) -> Vec<i32> {
    match bits {
        None | Some(-1) => Vec::new(),
        Some(bits) => positions(bits).into_iter().map(|p| p - 1).collect(),
    }
}

/// Five row bitmaps, missing rows read as empty
pub fn board_rows(slots: &[Option<i32>]) -> Vec<i32> {
    (0..BOARD_ROWS)
        .map(|i| slots.get(i).copied().flatten().unwrap_or(0))
        .collect()
}

/// True when every cell of a 5x6 board is set
pub fn covers_board(rows: &[i32]) -> bool {
    let full_row = (1 << BOARD_COLS) - 1;
    rows.len() == BOARD_ROWS && rows.iter().all(|r| r & full_row == full_row)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bind_both_leaders() {
        assert_eq!(bind_slots(Some(0b011)), vec![BindSlot::BothLeaders]);
        assert_eq!(
            bind_slots(Some(0b110)),
            vec![BindSlot::FriendLeader, BindSlot::Subs]
        );
        assert_eq!(bind_slots(None), vec![BindSlot::Random]);
    }

    #[test]
    fn test_positions_are_one_based() {
        assert_eq!(positions(0b1001), vec![1, 4]);
        assert!(positions(0).is_empty());
        assert!(positions(-1).is_empty());
    }

    #[test]
    fn test_typings() {
        assert_eq!(typings(Some(0b101)), vec![0, 2]);
        assert!(typings(Some(-1)).is_empty());
    }

    #[test]
    fn test_board_coverage() {
        let full = board_rows(&[Some(63); 5]);
        assert!(covers_board(&full));
        let partial = board_rows(&[Some(63), Some(63), None]);
        assert_eq!(partial, vec![63, 63, 0, 0, 0]);
        assert!(!covers_board(&partial));
    }
}
