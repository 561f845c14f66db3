// Recognizes chess server notifications in free text: offers, takeback replies, game creation
// announcements, channel lists and known noise.
//
// Matchers run in a fixed order. Order matters: a reply to our own takeback request must be
// recognized before the generic takeback offer.

use crate::once_cell_regex;


#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerRating {
    pub name: String,
    // As printed by the server: digits, or placeholders like "----" or "++++".
    pub rating: String,
}

impl PlayerRating {
    pub fn numeric(&self) -> Option<u32> { self.rating.trim().parse().ok() }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    TakebackReply { requester: String, accepted: bool },
    TakebackOffer { from: String, half_moves: u32 },
    GameCreated { first: PlayerRating, second: PlayerRating },
    Challenge { first: PlayerRating, second: PlayerRating, terms: String },
    AbortOffer { from: String },
    DrawOffer { from: String },
    ChannelList { channels: Vec<String> },
    // Acknowledgements that should not be shown at all.
    Noise,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct MatchContext {
    // Whether a takeback we asked for is still unanswered.
    pub takeback_pending: bool,
}

type Matcher = fn(&str, &MatchContext) -> Option<Notification>;

static MATCHERS: [Matcher; 8] = [
    takeback_reply,
    takeback_offer,
    game_created,
    challenge,
    abort_offer,
    draw_offer,
    channel_list,
    noise,
];

const NOISE: [&str; 3] = [
    "Style 12 set.",
    "You will not see seek ads.",
    "You will now hear communications echoed.",
];

// All interpretations of `text`, most specific first. The caller takes the first one it can act
// on; text that nobody consumes belongs in the console.
pub fn candidates<'a>(
    text: &'a str, ctx: &'a MatchContext,
) -> impl Iterator<Item = Notification> + 'a {
    MATCHERS.iter().filter_map(move |matcher| matcher(text, ctx))
}

fn takeback_reply(text: &str, ctx: &MatchContext) -> Option<Notification> {
    if !ctx.takeback_pending {
        return None;
    }
    let third_person_re = once_cell_regex!(r"(\w+) (\w+) the takeback request\.");
    let first_person_re = once_cell_regex!(r"You (\w+) the takeback request from (\w+)\.");
    let (requester, action) = if let Some(caps) = third_person_re.captures(text) {
        (caps[1].to_owned(), caps[2].to_owned())
    } else {
        let caps = first_person_re.captures(text)?;
        (caps[2].to_owned(), caps[1].to_owned())
    };
    Some(Notification::TakebackReply { requester, accepted: !action.starts_with("decline") })
}

fn takeback_offer(text: &str, _: &MatchContext) -> Option<Notification> {
    let caps = once_cell_regex!(r"(\w+) would like to take back (\d+) half move\(s\)\.")
        .captures(text)?;
    Some(Notification::TakebackOffer {
        from: caps[1].to_owned(),
        half_moves: caps[2].parse().ok()?,
    })
}

fn game_created(text: &str, _: &MatchContext) -> Option<Notification> {
    let caps = once_cell_regex!(r"Creating: (\w+) \(([\d+\-\s]{4})\) (\w+) \(([\d+\-\s]{4})\).+")
        .captures(text)?;
    Some(Notification::GameCreated {
        first: PlayerRating { name: caps[1].to_owned(), rating: caps[2].to_owned() },
        second: PlayerRating { name: caps[3].to_owned(), rating: caps[4].to_owned() },
    })
}

fn challenge(text: &str, _: &MatchContext) -> Option<Notification> {
    let caps = once_cell_regex!(concat!(
        r"Challenge: (\w+) \(([\d+\-\s]{4})\) (\w+) \(([\d+\-\s]{4})\)\s((?:.+[.\r\n])+)",
        r#"You can "accept" or "decline", or propose different parameters."#,
    ))
    .captures(text)?;
    Some(Notification::Challenge {
        first: PlayerRating { name: caps[1].to_owned(), rating: caps[2].to_owned() },
        second: PlayerRating { name: caps[3].to_owned(), rating: caps[4].to_owned() },
        terms: caps[5].trim().to_owned(),
    })
}

fn abort_offer(text: &str, _: &MatchContext) -> Option<Notification> {
    let caps = once_cell_regex!(r#"(\w+) would like to abort the game; type "abort" to accept."#)
        .captures(text)?;
    Some(Notification::AbortOffer { from: caps[1].to_owned() })
}

fn draw_offer(text: &str, _: &MatchContext) -> Option<Notification> {
    let caps = once_cell_regex!(r"(\w+) offers you a draw.").captures(text)?;
    Some(Notification::DrawOffer { from: caps[1].to_owned() })
}

fn channel_list(text: &str, _: &MatchContext) -> Option<Notification> {
    let caps = once_cell_regex!(r"-- channel list: \d+ channels --\n([\d\s]*)").captures(text)?;
    let channels = caps[1].split_whitespace().map(str::to_owned).collect();
    Some(Notification::ChannelList { channels })
}

fn noise(text: &str, _: &MatchContext) -> Option<Notification> {
    NOISE.contains(&text).then_some(Notification::Noise)
}


#[cfg(test)]
mod tests {
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    use super::*;

    fn first(text: &str, takeback_pending: bool) -> Option<Notification> {
        candidates(text, &MatchContext { takeback_pending }).next()
    }

    fn player(name: &str, rating: &str) -> PlayerRating {
        PlayerRating { name: name.to_owned(), rating: rating.to_owned() }
    }

    #[test]
    fn takeback_reply_needs_pending_request() {
        let text = "bob accepts the takeback request.";
        assert_eq!(
            first(text, true),
            Some(Notification::TakebackReply { requester: "bob".to_owned(), accepted: true })
        );
        assert_eq!(first(text, false), None);
        assert_eq!(
            first("You decline the takeback request from bob.", true),
            Some(Notification::TakebackReply { requester: "bob".to_owned(), accepted: false })
        );
    }

    #[test]
    fn reply_precedes_offer() {
        let text = "bob declines the takeback request. bob would like to take back 2 half move(s).";
        let all: Vec<_> = candidates(text, &MatchContext { takeback_pending: true }).collect();
        assert_eq!(all, vec![
            Notification::TakebackReply { requester: "bob".to_owned(), accepted: false },
            Notification::TakebackOffer { from: "bob".to_owned(), half_moves: 2 },
        ]);
    }

    #[test]
    fn game_creation() {
        let text = "Creating: alice (1500) bob (----) unrated blitz 5 0";
        let Some(Notification::GameCreated { first: a, second: b }) = first(text, false) else {
            panic!("expected game creation");
        };
        assert_eq!(a, player("alice", "1500"));
        assert_eq!(a.numeric(), Some(1500));
        assert_eq!(b.numeric(), None);
    }

    #[test]
    fn challenge_terms() {
        let text = indoc!(r#"
            Challenge: alice (1500) bob (1623) unrated blitz 5 0.
            You can "accept" or "decline", or propose different parameters."#);
        assert_eq!(first(text, false), Some(Notification::Challenge {
            first: player("alice", "1500"),
            second: player("bob", "1623"),
            terms: "unrated blitz 5 0.".to_owned(),
        }));
    }

    #[test]
    fn offers() {
        assert_eq!(
            first(r#"bob would like to abort the game; type "abort" to accept."#, false),
            Some(Notification::AbortOffer { from: "bob".to_owned() })
        );
        assert_eq!(
            first("bob offers you a draw.", false),
            Some(Notification::DrawOffer { from: "bob".to_owned() })
        );
    }

    #[test]
    fn channels() {
        let text = "-- channel list: 3 channels --\n1 4 53\n";
        assert_eq!(
            first(text, false),
            Some(Notification::ChannelList {
                channels: vec!["1".to_owned(), "4".to_owned(), "53".to_owned()]
            })
        );
    }

    #[test]
    fn noise_and_plain_text() {
        assert_eq!(first("Style 12 set.", false), Some(Notification::Noise));
        assert_eq!(first("Style 12 set. Really.", false), None);
        assert_eq!(first("fics% ", false), None);
    }
}
