/// Line being edited at the prompt.
#[derive(Debug, Default)]
pub struct Buffer {
    line: String,
}

impl Buffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.line.clear();
    }

    pub fn set(&mut self, s: &str) {
        self.line = s.to_string();
    }

    pub fn push(&mut self, ch: char) {
        self.line.push(ch);
    }

    pub fn push_str(&mut self, s: &str) {
        self.line.push_str(s);
    }

    /// Inserts a character at char position `idx`, appending when past the end.
    pub fn insert(&mut self, idx: usize, ch: char) {
        let at = self.byte_index(idx);
        self.line.insert(at, ch);
    }

    /// Removes the character at char position `idx`, if any.
    pub fn remove(&mut self, idx: usize) {
        if idx < self.len() {
            let at = self.byte_index(idx);
            self.line.remove(at);
        }
    }

    pub fn as_str(&self) -> &str {
        &self.line
    }

    /// Trimmed input ready to be parsed.
    pub fn build(&self) -> String {
        self.line.trim().to_string()
    }

    /// Length in chars.
    pub fn len(&self) -> usize {
        self.line.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.line.is_empty()
    }

    fn byte_index(&self, idx: usize) -> usize {
        self.line
            .char_indices()
            .nth(idx)
            .map_or(self.line.len(), |(i, _)| i)
    }
}
