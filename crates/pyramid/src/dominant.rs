//! Dominant-year selection for aggregated loss cells.
//!
//! When many source cells collapse into one coarser cell, the year that
//! represents the aggregate is neither the most frequent nor the most recent
//! one: it is the year of whichever contributing cell carries the largest
//! loss quantity. The visually and ecologically dominant event in a block is
//! the one with the most loss mass.
//!
//! Ties on the maximal quantity resolve to the smallest year, and an empty
//! group (all contributors unset) yields no value. Both rules are fixed so
//! that repeated runs produce bit-identical pyramids.

/// An ephemeral (year, weight) pairing for one contributing cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightedCell {
    /// Year value carried by the cell.
    pub year: f32,
    /// Aggregated loss quantity of the cell at the current pyramid step.
    pub weight: f32,
}

impl WeightedCell {
    pub fn new(year: f32, weight: f32) -> Self {
        Self { year, weight }
    }
}

/// Select the dominant year from a group of weighted cells.
///
/// Returns the year paired with the maximal weight, `None` for an empty
/// group. On equal maximal weights the lowest year wins.
pub fn dominant_year(cells: impl IntoIterator<Item = WeightedCell>) -> Option<f32> {
    let mut best: Option<WeightedCell> = None;

    for cell in cells {
        best = match best {
            None => Some(cell),
            Some(current) => {
                if cell.weight > current.weight
                    || (cell.weight == current.weight && cell.year < current.year)
                {
                    Some(cell)
                } else {
                    Some(current)
                }
            }
        };
    }

    best.map(|c| c.year)
}
