// Chat panel: one tab per conversation. Channel tabs are keyed by channel number, private
// conversations by the other party's handle. Keys are case-insensitive.

use std::collections::HashMap;

use lazy_static::lazy_static;

use crate::once_cell_regex;


pub const CONSOLE_TAB: &str = "console";

lazy_static! {
    static ref CHANNEL_NAMES: HashMap<u32, &'static str> = HashMap::from([
        (0, "Admins"),
        (1, "Help"),
        (2, "General"),
        (3, "Programming"),
        (4, "Guest Help"),
        (5, "Service Representatives"),
        (6, "Help (Interface & Timeseal)"),
        (7, "Online Tours"),
        (20, "Forming Team games"),
        (21, "Playing Team games"),
        (22, "Playing Team games"),
        (23, "Forming Simuls"),
        (30, "Books & Knowledge"),
        (31, "Computer Games"),
        (32, "Movies"),
        (33, "Ducks"),
        (34, "Sports"),
        (35, "Music"),
        (36, "Mathematics & Physics"),
        (37, "Philosophy"),
        (38, "Literature & Poetry"),
        (39, "Politics"),
        (40, "Religion"),
        (41, "Current Affairs"),
        (48, "Mamer Managers"),
        (49, "Mamer Tournament"),
        (50, "Chat"),
        (51, "Youth"),
        (52, "Old Timers"),
        (53, "Guest Chat"),
        (55, "Chess"),
        (56, "Beginner Chess"),
        (57, "Coaching"),
        (58, "Chess Books"),
        (60, "Chess Openings/Theory"),
        (61, "Chess Endgames"),
        (62, "Blindfold Chess"),
        (63, "Chess Advisors"),
        (64, "Computer Chess"),
        (65, "Special Events"),
        (66, "Examine"),
        (67, "Lectures"),
        (68, "Ex-Yugoslav"),
        (69, "Latin"),
        (70, "Finnish"),
        (71, "Scandinavian"),
        (72, "German"),
        (73, "Spanish"),
        (74, "Italian"),
        (75, "Russian"),
        (76, "Dutch"),
        (77, "French"),
        (78, "Greek"),
        (79, "Icelandic"),
        (80, "Chinese"),
        (81, "Turkish"),
        (82, "Portuguese"),
        (83, "Computer"),
        (84, "Macintosh/Apple"),
        (85, "Unix/Linux"),
        (86, "DOS/Windows 3.1/95/NT"),
        (87, "VMS"),
        (88, "Programming"),
        (90, "The STC BUNCH"),
        (91, "Suicide Chess"),
        (92, "Wild Chess"),
        (93, "Bughouse Chess"),
        (94, "Gambit"),
        (95, "Scholastic Chess"),
        (96, "College Chess"),
        (97, "Crazyhouse Chess"),
        (98, "Losers Chess"),
        (99, "Atomic Chess"),
        (100, "Trivia"),
    ]);
}

// Human-readable name of a conversation: the channel name for known channel numbers, the key
// itself otherwise.
pub fn conversation_title(key: &str) -> String {
    key.parse::<u32>()
        .ok()
        .and_then(|number| CHANNEL_NAMES.get(&number))
        .map_or_else(|| key.to_owned(), |name| (*name).to_owned())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextSpan {
    Text(String),
    Link(String),
    // Link to a picture that can be previewed inline.
    Image(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatLine {
    // `None` for lines without an author, e.g. server output in the console tab.
    pub sender: Option<String>,
    pub mine: bool,
    pub body: Vec<TextSpan>,
}

#[derive(Clone, Debug)]
pub struct ChatTab {
    pub key: String,
    pub title: String,
    pub lines: Vec<ChatLine>,
    pub unread: bool,
    // Number of newest lines below the visible window. Stays zero while autoscrolling.
    pub scroll_back: usize,
}

impl ChatTab {
    fn new(key: String, title: String) -> Self {
        ChatTab { key, title, lines: Vec::new(), unread: false, scroll_back: 0 }
    }

    // The window of at most `height` lines that ends `scroll_back` lines above the newest one.
    pub fn visible_lines(&self, height: usize) -> &[ChatLine] {
        let end = self.lines.len() - self.scroll_back.min(self.lines.len());
        &self.lines[end.saturating_sub(height)..end]
    }
}

// What happened to the tab that received a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageDisplay {
    Scrolled,
    Appended,
    MarkedUnread,
}

#[derive(Clone, Debug)]
pub struct ChannelEntry {
    pub number: String,
    pub title: String,
}

#[derive(Debug)]
pub struct ChatPanel {
    my_handle: String,
    tabs: Vec<ChatTab>,
    focused: String,
    autoscroll: bool,
    channel_picker: Vec<ChannelEntry>,
}

impl ChatPanel {
    pub fn new(autoscroll: bool) -> Self {
        let console = ChatTab::new(CONSOLE_TAB.to_owned(), CONSOLE_TAB.to_owned());
        ChatPanel {
            my_handle: String::new(),
            tabs: vec![console],
            focused: CONSOLE_TAB.to_owned(),
            autoscroll,
            channel_picker: Vec::new(),
        }
    }

    pub fn my_handle(&self) -> &str { &self.my_handle }
    pub fn set_handle(&mut self, handle: &str) { self.my_handle = handle.to_owned(); }
    pub fn tabs(&self) -> &[ChatTab] { &self.tabs }
    pub fn tab(&self, key: &str) -> Option<&ChatTab> {
        let key = key.to_lowercase();
        self.tabs.iter().find(|tab| tab.key == key)
    }
    pub fn focused(&self) -> &str { &self.focused }
    pub fn focused_tab(&self) -> Option<&ChatTab> { self.tab(&self.focused) }
    pub fn autoscroll(&self) -> bool { self.autoscroll }
    pub fn channel_picker(&self) -> &[ChannelEntry] { &self.channel_picker }

    // Turning autoscroll back on jumps to the newest line.
    pub fn toggle_autoscroll(&mut self) -> bool {
        self.autoscroll = !self.autoscroll;
        if self.autoscroll {
            self.scroll(isize::MIN);
        }
        self.autoscroll
    }

    // Moves the focused tab's window: positive `lines` go back in time.
    pub fn scroll(&mut self, lines: isize) {
        let focused = self.focused.clone();
        let tab = self.create_or_get_tab(&focused);
        let wanted = tab.scroll_back.saturating_add_signed(lines);
        tab.scroll_back = wanted.min(tab.lines.len().saturating_sub(1));
    }

    // Returns the tab for `key`, creating it if needed.
    pub fn create_or_get_tab(&mut self, key: &str) -> &mut ChatTab {
        let lower = key.to_lowercase();
        let index = match self.tabs.iter().position(|tab| tab.key == lower) {
            Some(index) => index,
            None => {
                self.tabs.push(ChatTab::new(lower, conversation_title(key)));
                self.tabs.len() - 1
            }
        };
        &mut self.tabs[index]
    }

    // The console tab stays. Focus moves to the last remaining tab if the closed one had it.
    pub fn close_tab(&mut self, key: &str) -> bool {
        let key = key.to_lowercase();
        if key == CONSOLE_TAB {
            return false;
        }
        let before = self.tabs.len();
        self.tabs.retain(|tab| tab.key != key);
        if self.focused == key {
            if let Some(last) = self.tabs.last() {
                self.focused = last.key.clone();
            }
        }
        self.tabs.len() != before
    }

    pub fn focus(&mut self, key: &str) {
        let tab = self.create_or_get_tab(key);
        tab.unread = false;
        self.focused = tab.key.clone();
    }

    pub fn new_message(&mut self, key: &str, sender: Option<&str>, text: &str) -> MessageDisplay {
        let mine = sender.is_some_and(|s| s == self.my_handle);
        let line = ChatLine { sender: sender.map(str::to_owned), mine, body: decorate(text) };
        let is_focused = key.to_lowercase() == self.focused;
        let autoscroll = self.autoscroll;
        let tab = self.create_or_get_tab(key);
        tab.lines.push(line);
        if is_focused {
            if autoscroll {
                tab.scroll_back = 0;
                MessageDisplay::Scrolled
            } else {
                // Keep the window on the lines the user is reading.
                tab.scroll_back += 1;
                MessageDisplay::Appended
            }
        } else {
            tab.unread = true;
            MessageDisplay::MarkedUnread
        }
    }

    pub fn add_channels(&mut self, channels: &[String]) {
        self.channel_picker = channels
            .iter()
            .map(|number| ChannelEntry { number: number.clone(), title: conversation_title(number) })
            .collect();
    }
}

// Replaces shortcodes like ":smile:" with the emoji. Unknown shortcodes stay as typed.
pub fn expand_emoji(text: &str) -> String {
    once_cell_regex!(r":([a-z0-9_+\-]+):")
        .replace_all(text, |caps: &crate::util::Captures| {
            match emojis::get_by_shortcode(&caps[1]) {
                Some(emoji) => emoji.as_str().to_owned(),
                None => caps[0].to_owned(),
            }
        })
        .into_owned()
}

// Splits text into plain text and links, expanding emoji in the text parts. Links to pictures
// are marked as images.
pub fn decorate(text: &str) -> Vec<TextSpan> {
    let url_re = once_cell_regex!(r"(?i)\b(?:https?://|www\.)[^\s<>]+[^\s<>.,;:!?)\]'\x22]");
    let image_re = once_cell_regex!(r"(?i)\.(gif|png|jpe?g)$");
    let mut spans = Vec::new();
    let mut last = 0;
    for m in url_re.find_iter(text) {
        if m.start() > last {
            spans.push(TextSpan::Text(expand_emoji(&text[last..m.start()])));
        }
        let url = m.as_str().to_owned();
        spans.push(if image_re.is_match(&url) { TextSpan::Image(url) } else { TextSpan::Link(url) });
        last = m.end();
    }
    if last < text.len() {
        spans.push(TextSpan::Text(expand_emoji(&text[last..])));
    }
    spans
}


#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn tabs_are_created_once() {
        let mut chat = ChatPanel::new(true);
        chat.new_message("53", Some("alice"), "hi");
        assert_eq!(chat.tabs().len(), 2);
        chat.new_message("53", Some("bob"), "hello");
        assert_eq!(chat.tabs().len(), 2);
        let tab = chat.tab("53").unwrap();
        assert_eq!(tab.title, "Guest Chat");
        assert_eq!(tab.lines.len(), 2);
    }

    #[test]
    fn keys_ignore_case() {
        let mut chat = ChatPanel::new(true);
        chat.new_message("Alice", Some("Alice"), "hi");
        chat.new_message("alice", Some("Alice"), "again");
        assert_eq!(chat.tabs().len(), 2);
        assert_eq!(chat.tab("ALICE").unwrap().title, "Alice");
    }

    #[test]
    fn unread_unless_focused() {
        let mut chat = ChatPanel::new(true);
        chat.set_handle("me");
        assert_eq!(chat.new_message("bob", Some("bob"), "psst"), MessageDisplay::MarkedUnread);
        assert!(chat.tab("bob").unwrap().unread);
        chat.focus("bob");
        assert!(!chat.tab("bob").unwrap().unread);
        assert_eq!(chat.new_message("bob", Some("me"), "yes?"), MessageDisplay::Scrolled);
        assert!(chat.tab("bob").unwrap().lines[1].mine);
        chat.toggle_autoscroll();
        assert_eq!(chat.new_message("bob", Some("bob"), "..."), MessageDisplay::Appended);
    }

    #[test]
    fn window_stays_put_without_autoscroll() {
        let mut chat = ChatPanel::new(false);
        chat.focus("bob");
        for text in ["one", "two", "three"] {
            chat.new_message("bob", Some("bob"), text);
        }
        let tab = chat.tab("bob").unwrap();
        assert_eq!(tab.scroll_back, 3);
        assert!(tab.visible_lines(2).is_empty());

        chat.scroll(-2);
        let texts: Vec<_> =
            chat.tab("bob").unwrap().visible_lines(2).iter().map(|line| line.body.clone()).collect();
        assert_eq!(texts, vec![
            vec![TextSpan::Text("one".to_owned())],
            vec![TextSpan::Text("two".to_owned())],
        ]);

        chat.scroll(100);
        assert_eq!(chat.tab("bob").unwrap().scroll_back, 2);

        assert!(chat.toggle_autoscroll());
        assert_eq!(chat.tab("bob").unwrap().scroll_back, 0);
        assert_eq!(chat.new_message("bob", Some("bob"), "four"), MessageDisplay::Scrolled);
        assert_eq!(chat.tab("bob").unwrap().visible_lines(2).len(), 2);
    }

    #[test]
    fn console_tab_cannot_be_closed() {
        let mut chat = ChatPanel::new(true);
        chat.focus("2");
        assert!(!chat.close_tab(CONSOLE_TAB));
        assert!(chat.close_tab("2"));
        assert_eq!(chat.focused(), CONSOLE_TAB);
    }

    #[test]
    fn channel_picker_names() {
        let mut chat = ChatPanel::new(true);
        chat.add_channels(&["1".to_owned(), "4242".to_owned()]);
        let titles: Vec<_> = chat.channel_picker().iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, vec!["Help", "4242"]);
    }

    #[test]
    fn decoration() {
        assert_eq!(decorate("see https://example.com/a.png, and http://x.org/page."), vec![
            TextSpan::Text("see ".to_owned()),
            TextSpan::Image("https://example.com/a.png".to_owned()),
            TextSpan::Text(", and ".to_owned()),
            TextSpan::Link("http://x.org/page".to_owned()),
            TextSpan::Text(".".to_owned()),
        ]);
        assert_eq!(decorate("plain"), vec![TextSpan::Text("plain".to_owned())]);
    }

    #[test]
    fn emoji_shortcodes() {
        assert_eq!(expand_emoji("gg :smile: :+1:"), "gg 😄 👍");
        assert_eq!(expand_emoji(":nosuchcode: at 12:30:45"), ":nosuchcode: at 12:30:45");
        assert_eq!(decorate(":wave: https://x.org/a:b:"), vec![
            TextSpan::Text("👋 ".to_owned()),
            TextSpan::Link("https://x.org/a:b".to_owned()),
            TextSpan::Text(":".to_owned()),
        ]);
    }
}
