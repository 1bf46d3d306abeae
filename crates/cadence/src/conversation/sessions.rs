// Cadence
// Copyright (C) 2025 Throneless Tech

// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.

// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.

use cadence_common::cursor::ConversationCursor;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// This process's view of in-flight dialogues. The conversation store is
/// authoritative; the cache is reconciled against it on every inbound
/// message.
#[derive(Clone, Debug, Default)]
pub struct LocalSessions {
    inner: Arc<Mutex<HashMap<i64, ConversationCursor>>>,
}

impl LocalSessions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, user_id: i64) -> Option<ConversationCursor> {
        self.inner
            .lock()
            .ok()
            .and_then(|sessions| sessions.get(&user_id).cloned())
    }

    /// Replaces the local copy with what the store holds. Returns whether
    /// the two had diverged.
    pub fn reconcile(&self, user_id: i64, stored: Option<&ConversationCursor>) -> bool {
        let Ok(mut sessions) = self.inner.lock() else {
            return false;
        };
        let diverged = sessions.get(&user_id) != stored;
        if diverged {
            match stored {
                Some(cursor) => {
                    sessions.insert(user_id, cursor.clone());
                }
                None => {
                    sessions.remove(&user_id);
                }
            }
        }
        diverged
    }

    pub fn put(&self, user_id: i64, cursor: ConversationCursor) {
        if let Ok(mut sessions) = self.inner.lock() {
            sessions.insert(user_id, cursor);
        }
    }

    pub fn remove(&self, user_id: i64) {
        if let Ok(mut sessions) = self.inner.lock() {
            sessions.remove(&user_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cadence_common::touch::TouchType;
    use chrono::NaiveDate;

    fn cursor(index: i32) -> ConversationCursor {
        let mut cursor = ConversationCursor::questions(
            TouchType::Morning,
            1,
            1,
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            vec!["a".into(), "b".into()],
        );
        cursor.index = index;
        cursor
    }

    #[test]
    fn store_wins_on_divergence() {
        let sessions = LocalSessions::new();
        sessions.put(1, cursor(0));

        assert!(sessions.reconcile(1, Some(&cursor(1))));
        assert_eq!(sessions.get(1), Some(cursor(1)));
        assert!(!sessions.reconcile(1, Some(&cursor(1))));

        assert!(sessions.reconcile(1, None));
        assert_eq!(sessions.get(1), None);
    }
}
