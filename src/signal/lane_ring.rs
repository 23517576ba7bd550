// src/signal/lane_ring.rs
//
// Visitation order of an intersection's lanes.
//
// An intrusive doubly-linked ring indexed by lane id: `next[i]`/`prev[i]`
// are the lanes after/before lane `i`. Every lane id is always linked
// exactly once, so the order is a permutation of 0..n by construction.
// The head is the lane currently being (or about to be) served.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaneRing {
    next: Vec<usize>,
    prev: Vec<usize>,
    head: usize,
}

impl LaneRing {
    /// Ring visiting lanes in id order, starting at lane 0. `lanes` must
    /// be at least 1.
    pub fn new(lanes: usize) -> Self {
        debug_assert!(lanes > 0);
        let lanes = lanes.max(1);
        Self {
            next: (0..lanes).map(|i| (i + 1) % lanes).collect(),
            prev: (0..lanes).map(|i| (i + lanes - 1) % lanes).collect(),
            head: 0,
        }
    }

    fn len(&self) -> usize {
        self.next.len()
    }

    pub fn head(&self) -> usize {
        self.head
    }

    /// Head moves to the tail; its successor becomes the new head.
    pub fn rotate(&mut self) -> usize {
        self.head = self.next[self.head];
        self.head
    }

    /// Move `lane` so it is served right after `anchor`.
    ///
    /// Returns false (and changes nothing) when `lane == anchor` or either
    /// id is out of range. Already being next is a no-op that returns true.
    pub fn move_after(&mut self, lane: usize, anchor: usize) -> bool {
        let n = self.len();
        if lane >= n || anchor >= n || lane == anchor {
            return false;
        }
        if self.next[anchor] == lane {
            return true;
        }

        // unlink
        let (p, q) = (self.prev[lane], self.next[lane]);
        self.next[p] = q;
        self.prev[q] = p;
        if self.head == lane {
            self.head = q;
        }

        // relink after anchor
        let after = self.next[anchor];
        self.next[anchor] = lane;
        self.prev[lane] = anchor;
        self.next[lane] = after;
        self.prev[after] = lane;
        true
    }

    /// Lanes in visiting order, head first.
    pub fn order(&self) -> Vec<usize> {
        let mut out = Vec::with_capacity(self.len());
        let mut cur = self.head;
        for _ in 0..self.len() {
            out.push(cur);
            cur = self.next[cur];
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_permutation(order: &[usize], n: usize) -> bool {
        let mut seen = vec![false; n];
        order.len() == n
            && order.iter().all(|&i| {
                let fresh = i < n && !seen[i];
                if fresh {
                    seen[i] = true;
                }
                fresh
            })
    }

    #[test]
    fn test_initial_order() {
        let ring = LaneRing::new(4);
        assert_eq!(ring.order(), vec![0, 1, 2, 3]);
        assert_eq!(ring.head(), 0);
    }

    #[test]
    fn test_rotation_visits_each_lane_once() {
        let mut ring = LaneRing::new(5);
        let mut visited = vec![ring.head()];
        for _ in 0..4 {
            visited.push(ring.rotate());
        }
        visited.sort_unstable();
        assert_eq!(visited, vec![0, 1, 2, 3, 4]);
        assert_eq!(ring.rotate(), 0);
    }

    #[test]
    fn test_move_after_head() {
        let mut ring = LaneRing::new(4);
        assert!(ring.move_after(2, 0));
        assert_eq!(ring.order(), vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_latest_move_wins_slot() {
        let mut ring = LaneRing::new(5);
        ring.move_after(3, 0);
        ring.move_after(4, 0);
        assert_eq!(ring.order(), vec![0, 4, 3, 1, 2]);
    }

    #[test]
    fn test_repeat_move_is_idempotent() {
        let mut ring = LaneRing::new(4);
        ring.move_after(3, 0);
        let once = ring.clone();
        ring.move_after(3, 0);
        assert_eq!(ring, once);
    }

    #[test]
    fn test_move_tail_lane_after_rotated_head() {
        let mut ring = LaneRing::new(4);
        ring.rotate();
        // order is now [1, 2, 3, 0]
        assert!(ring.move_after(0, 1));
        assert_eq!(ring.order(), vec![1, 0, 2, 3]);
    }

    #[test]
    fn test_rejects_invalid_moves() {
        let mut ring = LaneRing::new(3);
        let before = ring.clone();
        assert!(!ring.move_after(3, 0));
        assert!(!ring.move_after(0, 7));
        assert!(!ring.move_after(1, 1));
        assert_eq!(ring, before);
    }

    #[test]
    fn test_moving_head_elsewhere_advances_head() {
        let mut ring = LaneRing::new(4);
        assert!(ring.move_after(0, 2));
        assert_eq!(ring.order(), vec![1, 2, 0, 3]);
    }

    #[test]
    fn test_stays_a_permutation_under_churn() {
        let n = 7;
        let mut ring = LaneRing::new(n);
        for step in 0..200usize {
            let lane = (step * 5 + 3) % n;
            let anchor = ring.head();
            ring.move_after(lane, anchor);
            if step % 3 == 0 {
                ring.rotate();
            }
            assert!(is_permutation(&ring.order(), n));
        }
    }

    #[test]
    fn test_single_lane_ring() {
        let mut ring = LaneRing::new(1);
        assert_eq!(ring.rotate(), 0);
        assert!(!ring.move_after(0, 0));
        assert_eq!(ring.order(), vec![0]);
    }
}
