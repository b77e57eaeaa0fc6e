// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Dependency parsing of sentences to find a verb and its direct object.

mod python_child;
mod spacy;

use std::io;

use derive_more::{Deref, From};
use displaydoc::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::spacy::{SpacyConfig, SpacyParser};

/// The universal part-of-speech tag of verbs.
const VERB: &str = "VERB";

/// The dependency label of direct objects.
const DIRECT_OBJECT: &str = "dobj";

/// A token of a parsed sentence.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct Token {
    pub text: String,
    /// The char offset of the token within the sentence.
    #[serde(rename = "idx")]
    pub offset: usize,
    /// The coarse universal part-of-speech tag.
    pub pos: String,
    /// The dependency label.
    pub dep: String,
    /// The index of the head token, the root is its own head.
    pub head: usize,
}

/// A parsed sentence.
#[derive(Clone, Debug, Default, Deref, From, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Doc(Vec<Token>);

/// A verb and its direct object.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
pub struct VerbObject {
    pub verb: String,
    pub object: String,
}

impl Doc {
    /// Iterates over the direct children of the token at `index` in document order.
    pub fn children(&self, index: usize) -> impl Iterator<Item = &Token> {
        self.0
            .iter()
            .enumerate()
            .filter(move |(i, token)| *i != index && token.head == index)
            .map(|(_, token)| token)
    }

    /// Finds the first verb and its first direct object.
    ///
    /// Only the first verb of the sentence is considered, if it has no direct object then there is
    /// no pair even if a later verb has one.
    pub fn verb_object(&self) -> Option<VerbObject> {
        let (index, verb) = self
            .0
            .iter()
            .enumerate()
            .find(|(_, token)| token.pos == VERB)?;
        let object = self
            .children(index)
            .find(|token| token.dep == DIRECT_OBJECT)?;

        Some(VerbObject {
            verb: verb.text.clone(),
            object: object.text.clone(),
        })
    }
}

/// The potential errors of a [`DependencyParser`].
#[derive(Debug, Display, Error)]
pub enum ParserError {
    /// Failed to communicate with the parser: {0}
    Io(#[from] io::Error),
    /// Failed to encode the parser request: {0}
    Encode(#[from] rmp_serde::encode::Error),
    /// Failed to decode the parser response: {0}
    Decode(#[from] rmp_serde::decode::Error),
    /// The parser failed: {0}
    Parser(String),
}

/// A dependency parser for sentences.
pub trait DependencyParser {
    /// Parses the sentence into its tokens and dependencies.
    fn parse(&mut self, sentence: &str) -> Result<Doc, ParserError>;

    /// Parses the sentence and finds its first verb and that verb's direct object.
    fn extract_verb_object(&mut self, sentence: &str) -> Result<Option<VerbObject>, ParserError> {
        self.parse(sentence).map(|doc| doc.verb_object())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::collections::HashMap;

    use super::*;

    pub(crate) fn token(text: &str, offset: usize, pos: &str, dep: &str, head: usize) -> Token {
        Token {
            text: text.into(),
            offset,
            pos: pos.into(),
            dep: dep.into(),
            head,
        }
    }

    /// The parses of the example sentences.
    pub(crate) fn docs() -> HashMap<&'static str, Doc> {
        [
            (
                "I ate the soup.",
                vec![
                    token("I", 0, "PRON", "nsubj", 1),
                    token("ate", 2, "VERB", "ROOT", 1),
                    token("the", 6, "DET", "det", 3),
                    token("soup", 10, "NOUN", "dobj", 1),
                    token(".", 14, "PUNCT", "punct", 1),
                ],
            ),
            (
                "I cooked pasta for dinner.",
                vec![
                    token("I", 0, "PRON", "nsubj", 1),
                    token("cooked", 2, "VERB", "ROOT", 1),
                    token("pasta", 9, "NOUN", "dobj", 1),
                    token("for", 15, "ADP", "prep", 1),
                    token("dinner", 19, "NOUN", "pobj", 3),
                    token(".", 25, "PUNCT", "punct", 1),
                ],
            ),
            (
                "The dog.",
                vec![
                    token("The", 0, "DET", "det", 1),
                    token("dog", 4, "NOUN", "ROOT", 1),
                    token(".", 7, "PUNCT", "punct", 1),
                ],
            ),
            (
                "I slept and ate the soup.",
                vec![
                    token("I", 0, "PRON", "nsubj", 1),
                    token("slept", 2, "VERB", "ROOT", 1),
                    token("and", 8, "CCONJ", "cc", 1),
                    token("ate", 12, "VERB", "conj", 1),
                    token("the", 16, "DET", "det", 5),
                    token("soup", 20, "NOUN", "dobj", 3),
                    token(".", 24, "PUNCT", "punct", 1),
                ],
            ),
        ]
        .into_iter()
        .map(|(sentence, tokens)| (sentence, Doc::from(tokens)))
        .collect()
    }

    /// A parser which looks up precomputed parses.
    pub(crate) struct MockedParser(pub(crate) HashMap<&'static str, Doc>);

    impl DependencyParser for MockedParser {
        fn parse(&mut self, sentence: &str) -> Result<Doc, ParserError> {
            self.0
                .get(sentence)
                .cloned()
                .ok_or_else(|| ParserError::Parser(format!("unknown sentence: {sentence}")))
        }
    }

    fn verb_object(verb: &str, object: &str) -> Option<VerbObject> {
        Some(VerbObject {
            verb: verb.into(),
            object: object.into(),
        })
    }

    #[test]
    fn test_children() {
        let docs = docs();
        let doc = &docs["I cooked pasta for dinner."];
        let children = doc
            .children(1)
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(children, ["I", "pasta", "for", "."]);
        let children = doc
            .children(3)
            .map(|token| token.text.as_str())
            .collect::<Vec<_>>();
        assert_eq!(children, ["dinner"]);
        assert_eq!(doc.children(0).count(), 0);
    }

    #[test]
    fn test_verb_object() {
        let docs = docs();
        assert_eq!(docs["I ate the soup."].verb_object(), verb_object("ate", "soup"));
        assert_eq!(
            docs["I cooked pasta for dinner."].verb_object(),
            verb_object("cooked", "pasta"),
        );
    }

    #[test]
    fn test_verb_object_without_verb() {
        assert!(docs()["The dog."].verb_object().is_none());
        assert!(Doc::default().verb_object().is_none());
    }

    #[test]
    fn test_verb_object_first_verb_only() {
        // "ate" has a direct object, but "slept" is the first verb
        assert!(docs()["I slept and ate the soup."].verb_object().is_none());
    }

    #[test]
    fn test_verb_object_first_direct_object() {
        let doc = Doc::from(vec![
            token("gave", 0, "VERB", "ROOT", 0),
            token("soup", 5, "NOUN", "dobj", 0),
            token("pasta", 10, "NOUN", "dobj", 0),
        ]);
        assert_eq!(doc.verb_object(), verb_object("gave", "soup"));
    }

    #[test]
    fn test_extract_verb_object() {
        let mut parser = MockedParser(docs());
        assert_eq!(
            parser.extract_verb_object("I ate the soup.").unwrap(),
            verb_object("ate", "soup"),
        );
        assert!(parser.extract_verb_object("The dog.").unwrap().is_none());
        assert!(matches!(
            parser.extract_verb_object("unknown"),
            Err(ParserError::Parser(_)),
        ));
    }

    #[test]
    fn test_deserialize_doc() {
        let doc = serde_json::from_str::<Doc>(
            r#"[{"text": "ate", "idx": 2, "pos": "VERB", "dep": "ROOT", "head": 0}]"#,
        )
        .unwrap();
        assert_eq!(doc[0], token("ate", 2, "VERB", "ROOT", 0));
    }
}
