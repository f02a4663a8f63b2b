/// Passes free-form output from checks to the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Messenger {
    messages: Vec<String>,
    one_time: Vec<(String, String)>,
    gar_lines: Vec<String>,
}

impl Messenger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(&mut self, msg: impl Into<String>) {
        self.messages.push(msg.into());
    }

    /// Record `msg` under `key` unless something was already recorded there.
    pub fn one_time_message(&mut self, key: impl Into<String>, msg: impl Into<String>) {
        let key = key.into();
        if !self.one_time.iter().any(|(k, _)| *k == key) {
            self.one_time.push((key, msg.into()));
        }
    }

    /// Suggest a line for the package's build recipe.
    pub fn suggest_gar_line(&mut self, line: impl Into<String>) {
        self.gar_lines.push(line.into());
    }

    /// Regular messages followed by one-time messages.
    pub fn messages(&self) -> Vec<String> {
        self.messages.iter().cloned().chain(self.one_time.iter().map(|(_, m)| m.clone())).collect()
    }

    pub fn gar_lines(&self) -> &[String] {
        &self.gar_lines
    }

    /// Append everything `other` collected; earlier one-time keys win.
    pub fn merge(&mut self, other: Messenger) {
        self.messages.extend(other.messages);
        for (key, msg) in other.one_time {
            self.one_time_message(key, msg);
        }
        self.gar_lines.extend(other.gar_lines);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_time_messages_keep_the_first_value() {
        let mut m = Messenger::new();
        m.one_time_message("k", "first");
        m.one_time_message("k", "second");
        m.message("regular");
        assert_eq!(m.messages(), vec!["regular", "first"]);
    }

    #[test]
    fn merge_keeps_order() {
        let mut a = Messenger::new();
        a.suggest_gar_line("a");
        let mut b = Messenger::new();
        b.suggest_gar_line("b");
        a.merge(b);
        assert_eq!(a.gar_lines(), ["a", "b"]);
    }
}
