/// Sort order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    /// Ascending, the smallest key first
    Asc,
    /// Descending, the largest key first
    Desc,
}

impl Order {
    /// Create an [Order] from a reverse flag
    pub fn from_reverse(reverse: bool) -> Order {
        if reverse {
            Order::Desc
        } else {
            Order::Asc
        }
    }

    pub(crate) fn apply(&self, ordering: std::cmp::Ordering) -> std::cmp::Ordering {
        match self {
            Order::Asc => ordering,
            Order::Desc => ordering.reverse(),
        }
    }
}
