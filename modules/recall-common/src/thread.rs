// Discussion threads: the reply tree as downloaded, plus the two walks the
// drivers need (solved path for ground truth, whole forest for negatives).

use std::collections::VecDeque;

use serde::{Deserialize, Deserializer, Serialize};

use crate::types::RawMention;

/// Marker the originator writes when a reply answered their question.
const SOLVED_MARKER: &str = "solved";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    /// Originator's user name. `None` for deleted accounts.
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reply {
    pub id: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub author_name: Option<String>,
    /// Set on the reply that marks the thread as answered.
    #[serde(default)]
    pub accepted: bool,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub replies: Vec<Reply>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Reply>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Reply>>::deserialize(deserializer)?.unwrap_or_default())
}

impl Thread {
    fn is_originator(&self, reply: &Reply) -> bool {
        match (&self.author, &reply.author_name) {
            (Some(op), Some(author)) => op == author,
            _ => false,
        }
    }

    pub fn mention(&self, reply: &Reply) -> RawMention {
        RawMention {
            text: reply.body.clone(),
            author_id: reply.author_name.clone(),
            reply_id: reply.id.clone(),
            is_original_poster: self.is_originator(reply),
        }
    }

    /// Every reply in breadth-first order.
    pub fn replies_breadth_first(&self) -> Vec<&Reply> {
        let mut out = Vec::new();
        let mut queue: VecDeque<&Reply> = self.replies.iter().collect();
        while let Some(reply) = queue.pop_front() {
            out.push(reply);
            queue.extend(reply.replies.iter());
        }
        out
    }

    /// The reply that answered the thread.
    ///
    /// An explicitly `accepted` reply wins. Otherwise the thread counts as
    /// solved only if exactly one originator reply says "solved".
    pub fn accepted_reply_id(&self) -> Option<&str> {
        let replies = self.replies_breadth_first();
        if let Some(accepted) = replies.iter().find(|r| r.accepted) {
            return Some(accepted.id.as_str());
        }

        let mut solved = replies.iter().filter(|r| {
            self.is_originator(r) && r.body.to_lowercase().contains(SOLVED_MARKER)
        });
        let first = solved.next()?;
        if solved.next().is_some() {
            return None;
        }
        Some(first.id.as_str())
    }

    /// Replies from the top-level reply down to the accepted reply, inclusive.
    /// Empty when the thread has no (unique) accepted reply.
    pub fn solved_path(&self) -> Vec<&Reply> {
        let Some(target) = self.accepted_reply_id() else {
            return Vec::new();
        };
        let mut path = Vec::new();
        for root in &self.replies {
            if path_to(root, target, &mut path) {
                return path;
            }
        }
        Vec::new()
    }

    /// Mentions along the solved path, originator posts included (callers
    /// filter on `is_original_poster`).
    pub fn solved_path_mentions(&self) -> Vec<RawMention> {
        self.solved_path().into_iter().map(|r| self.mention(r)).collect()
    }

    /// Mentions for the whole reply forest, breadth-first.
    pub fn forest_mentions(&self) -> Vec<RawMention> {
        self.replies_breadth_first()
            .into_iter()
            .map(|r| self.mention(r))
            .collect()
    }
}

fn path_to<'a>(node: &'a Reply, target: &str, path: &mut Vec<&'a Reply>) -> bool {
    path.push(node);
    if node.id == target {
        return true;
    }
    for child in &node.replies {
        if path_to(child, target, path) {
            return true;
        }
    }
    path.pop();
    false
}
