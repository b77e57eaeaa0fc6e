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

use figment::value::Dict;
use ndarray::Array2;
use tokenizers::{
    tokenizer::Tokenizer as HfTokenizer,
    utils::{
        padding::{PaddingDirection, PaddingParams, PaddingStrategy},
        truncation::{TruncationDirection, TruncationParams, TruncationStrategy},
    },
    Encoding as HfEncoding,
    Error,
};

use crate::config::Config;

/// A pre-configured huggingface tokenizer.
pub(crate) struct Tokenizer {
    hf_tokenizer: HfTokenizer,
    add_special_tokens: bool,
    use_type_ids: bool,
    token_size: usize,
}

/// The encoded sequence.
///
/// The arrays are of shape `(1, token_size)`. The char offsets of the tokens are kept to align
/// words of the sequence with their tokens.
pub struct Encoding {
    pub(crate) token_ids: Array2<i64>,
    pub(crate) attention_mask: Array2<i64>,
    pub(crate) type_ids: Option<Array2<i64>>,
    offsets: HfEncoding,
}

impl Encoding {
    /// Gets the index of the token which contains the char at `offset`.
    ///
    /// Special and padding tokens don't cover any chars.
    pub(crate) fn char_to_token(&self, offset: usize) -> Option<usize> {
        self.offsets.char_to_token(offset, 0)
    }
}

/// Gets the char offset of the first occurrence of `word` in the `sequence`.
///
/// This is a plain substring search, a word which is also part of an earlier word is found within
/// that earlier word.
pub(crate) fn char_offset(sequence: &str, word: &str) -> Option<usize> {
    sequence
        .find(word)
        .map(|byte_offset| sequence[..byte_offset].chars().count())
}

impl Tokenizer {
    pub(crate) fn new(config: &Config) -> Result<Self, Error> {
        let tokenizer = config.dir.join("tokenizer.json");
        if !tokenizer.exists() {
            return Err(format!("tokenizer '{}' doesn't exist", tokenizer.display()).into());
        }
        let tokenizer = HfTokenizer::from_file(tokenizer)?;

        Self::configure(tokenizer, config)
    }

    pub(crate) fn configure(mut tokenizer: HfTokenizer, config: &Config) -> Result<Self, Error> {
        let padding_token = config.extract::<String>("tokenizer.tokens.padding")?;
        let padding = PaddingParams {
            strategy: PaddingStrategy::Fixed(config.token_size),
            direction: PaddingDirection::Right,
            pad_to_multiple_of: None,
            pad_id: tokenizer
                .token_to_id(&padding_token)
                .ok_or("missing padding token")?,
            pad_type_id: 0,
            pad_token: padding_token,
        };
        let truncation = TruncationParams {
            direction: TruncationDirection::Right,
            max_length: config.token_size,
            strategy: TruncationStrategy::LongestFirst,
            stride: 0,
        };
        tokenizer.with_padding(Some(padding));
        tokenizer.with_truncation(Some(truncation));
        let use_type_ids = config.extract::<Dict>("model.input")?.len() > 2;
        let add_special_tokens = config.extract::<bool>("tokenizer.add-special-tokens")?;

        Ok(Tokenizer {
            hf_tokenizer: tokenizer,
            add_special_tokens,
            use_type_ids,
            token_size: config.token_size,
        })
    }

    pub(crate) fn token_size(&self) -> usize {
        self.token_size
    }

    /// Encodes the sequence.
    ///
    /// The encoding is in correct shape for the model.
    pub(crate) fn encode(&self, sequence: impl AsRef<str>) -> Result<Encoding, Error> {
        let encoding = self
            .hf_tokenizer
            .encode_char_offsets(sequence.as_ref(), self.add_special_tokens)?;
        let array_from =
            |slice: &[u32]| Array2::from_shape_fn((1, slice.len()), |(_, i)| i64::from(slice[i]));

        Ok(Encoding {
            token_ids: array_from(encoding.get_ids()),
            attention_mask: array_from(encoding.get_attention_mask()),
            type_ids: self
                .use_type_ids
                .then(|| array_from(encoding.get_type_ids())),
            offsets: encoding,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use tokenizers::{
        models::wordpiece::WordPieceBuilder,
        pre_tokenizers::{bert::BertPreTokenizer, PreTokenizerWrapper},
        processors::{bert::BertProcessing, PostProcessorWrapper},
    };

    use super::*;
    use crate::config::tests::config;

    pub(crate) const VOCAB: [&str; 16] = [
        "[PAD]", "[UNK]", "[CLS]", "[SEP]", "I", "ate", "the", "soup", ".", "The", "dog",
        "chased", "cooked", "pasta", "for", "dinner",
    ];

    /// A whitespace and punctuation splitting word level tokenizer over [`VOCAB`].
    pub(crate) fn hf_tokenizer() -> HfTokenizer {
        let vocab = VOCAB
            .iter()
            .enumerate()
            .map(|(id, token)| ((*token).to_string(), u32::try_from(id).unwrap()))
            .collect();
        let model = WordPieceBuilder::new()
            .vocab(vocab)
            .unk_token("[UNK]".into())
            .build()
            .unwrap();
        let mut tokenizer = HfTokenizer::new(model);
        tokenizer.with_pre_tokenizer(PreTokenizerWrapper::BertPreTokenizer(BertPreTokenizer));
        tokenizer.with_post_processor(PostProcessorWrapper::Bert(BertProcessing::new(
            ("[SEP]".into(), 3),
            ("[CLS]".into(), 2),
        )));
        tokenizer
    }

    pub(crate) fn tokenizer(token_size: usize) -> Tokenizer {
        let config = config().with_token_size(token_size).unwrap();
        Tokenizer::configure(hf_tokenizer(), &config).unwrap()
    }

    #[test]
    fn test_encode() {
        let encoding = tokenizer(10).encode("I ate the soup.").unwrap();
        assert_eq!(encoding.token_ids.shape(), [1, 10]);
        assert_eq!(
            encoding.token_ids.iter().copied().collect::<Vec<_>>(),
            [2, 4, 5, 6, 7, 8, 3, 0, 0, 0],
        );
        assert_eq!(
            encoding.attention_mask.iter().copied().collect::<Vec<_>>(),
            [1, 1, 1, 1, 1, 1, 1, 0, 0, 0],
        );
        assert!(encoding.type_ids.is_none());
        assert_eq!(tokenizer(10).token_size(), 10);
    }

    #[test]
    fn test_encode_truncation() {
        let encoding = tokenizer(4).encode("I ate the soup.").unwrap();
        assert_eq!(
            encoding.token_ids.iter().copied().collect::<Vec<_>>(),
            [2, 4, 5, 3],
        );
    }

    #[test]
    fn test_char_offset() {
        assert_eq!(char_offset("I ate the soup.", "ate"), Some(2));
        assert_eq!(char_offset("I ate the soup.", "soup"), Some(10));
        assert_eq!(char_offset("The dog chased the dog", "dog"), Some(4));
        assert_eq!(char_offset("I ate the soup.", "pasta"), None);
        // offsets are counted in chars, not in bytes
        assert_eq!(char_offset("Él ate the soup.", "ate"), Some(3));
    }

    #[test]
    fn test_char_offset_finds_substrings() {
        // "the" is found inside of "Bathe" before the standalone word
        assert_eq!(char_offset("Bathe the dog.", "the"), Some(2));
        assert_eq!(char_offset("The dog ate the soup.", "the"), Some(12));
    }

    #[test]
    fn test_char_to_token() {
        let encoding = tokenizer(10).encode("I ate the soup.").unwrap();
        assert_eq!(encoding.char_to_token(0), Some(1));
        assert_eq!(encoding.char_to_token(2), Some(2));
        assert_eq!(encoding.char_to_token(4), Some(2));
        assert_eq!(encoding.char_to_token(10), Some(4));
        assert_eq!(encoding.char_to_token(14), Some(5));
    }

    #[test]
    fn test_char_to_token_unaligned() {
        let encoding = tokenizer(10).encode("I ate the soup.").unwrap();
        // whitespace isn't covered by any token
        assert_eq!(encoding.char_to_token(1), None);
        // beyond the end of the sequence
        assert_eq!(encoding.char_to_token(15), None);

        // truncated tokens don't cover their chars anymore
        let encoding = tokenizer(4).encode("I ate the soup.").unwrap();
        assert_eq!(encoding.char_to_token(2), Some(2));
        assert_eq!(encoding.char_to_token(10), None);
    }

    #[test]
    fn test_default_token_size_keeps_late_words() {
        let tokenizer = Tokenizer::configure(hf_tokenizer(), &config()).unwrap();
        let sequence = "I ate the soup. I ate the soup. I cooked pasta.";
        let encoding = tokenizer.encode(sequence).unwrap();
        assert_eq!(encoding.token_ids.shape(), [1, 16]);

        let offset = char_offset(sequence, "pasta").unwrap();
        assert_eq!(encoding.char_to_token(offset), Some(13));
    }

    #[test]
    fn test_char_to_token_repeated_word() {
        let sequence = "The dog chased the dog";
        let encoding = tokenizer(10).encode(sequence).unwrap();
        let offset = char_offset(sequence, "dog").unwrap();
        assert_eq!(encoding.char_to_token(offset), Some(2));
        assert_eq!(encoding.char_to_token(19), Some(5));
    }
}
