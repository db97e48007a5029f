use std::collections::VecDeque;

/// Keeps the last `capacity` lines pushed into it.
#[derive(Debug, Clone)]
pub struct TailBuffer {
  lines: VecDeque<String>,
  capacity: usize,
}

impl TailBuffer {
  pub fn new(capacity: usize) -> Self {
    Self {
      lines: VecDeque::with_capacity(capacity.min(1024)),
      capacity,
    }
  }

  pub fn push(&mut self, line: String) {
    if self.capacity == 0 {
      return;
    }
    if self.lines.len() == self.capacity {
      self.lines.pop_front();
    }
    self.lines.push_back(line);
  }

  pub fn into_lines(self) -> Vec<String> {
    self.lines.into()
  }
}
