use ss_core::Pixel;

/// Per-pixel "already claimed" flags for one image.
#[derive(Debug, Clone, Default)]
pub struct VisitMask {
    width: usize,
    height: usize,
    visited: Vec<bool>,
}

impl VisitMask {
    pub fn new(rows: usize, cols: usize) -> Self {
        let mut mask = Self::default();
        mask.reset(rows, cols);
        mask
    }

    /// Resizes to `rows x cols` and clears every flag.
    pub fn reset(&mut self, rows: usize, cols: usize) {
        self.width = cols;
        self.height = rows;
        self.visited.clear();
        self.visited.resize(rows * cols, false);
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.visited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visited.is_empty()
    }

    fn index(&self, px: Pixel) -> Option<usize> {
        if px.x >= self.width || px.y >= self.height {
            return None;
        }
        Some(px.y * self.width + px.x)
    }

    /// Pixels outside the mask count as visited: they can never be claimed.
    pub fn is_visited(&self, px: Pixel) -> bool {
        self.index(px).is_none_or(|i| self.visited[i])
    }

    /// Marks `px` and returns whether it was free before.
    pub fn mark(&mut self, px: Pixel) -> bool {
        let Some(i) = self.index(px) else {
            return false;
        };
        let was_free = !self.visited[i];
        self.visited[i] = true;
        was_free
    }

    pub fn visited_count(&self) -> usize {
        self.visited.iter().filter(|&&v| v).count()
    }
}
