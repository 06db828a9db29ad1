mod constants;
pub mod filter;
mod stream;
mod tokens;

use constants::*;
pub use filter::{CompareOp, FilterExpr};
pub use stream::{PeekableExt, TokenStream};
pub use tokens::*;

use crate::errors::{JsonQueryError, JsonQueryResult};

/// Turns a JSONPath query string into a selector token list.
pub struct Tokenizer {}

impl Default for Tokenizer {
    fn default() -> Self {
        Tokenizer::new()
    }
}

impl Tokenizer {
    pub fn new() -> Self {
        Tokenizer {}
    }

    pub fn tokenize(&self, jsonpath: &str) -> JsonQueryResult<Vec<Token>> {
        let mut stream = TokenStream::new(jsonpath);
        stream.drop_while(|c| c.is_whitespace());
        let tokens = self.tokenize_embedded(&mut stream, 0)?;
        match stream.peek_significant() {
            None => Ok(tokens),
            Some(_) => Err(stream.error("illegal character, expected '.' or '['")),
        }
    }

    /// Reads a path starting at `$` or `@` and stops at the first char that
    /// cannot continue a path. Used for whole queries and for paths embedded
    /// in filter expressions; `depth` counts filter nesting so paths inside
    /// filters inside paths stay bounded.
    pub(crate) fn tokenize_embedded(
        &self,
        stream: &mut TokenStream,
        depth: usize,
    ) -> JsonQueryResult<Vec<Token>> {
        let root_path_char = stream
            .next_if(|c| self.is_root_path_char(c))
            .ok_or_else(|| stream.error("the jsonpath must start with '$' or '@'"))?;

        let mut tokens = vec![Token::Root(RootPathToken { root_path_char })];
        loop {
            match stream.peek() {
                Some(&PERIOD) | Some(&OPEN_SQUARE_BRACKET) => {
                    self.read_next_token(stream, &mut tokens, depth)?;
                }
                _ => break,
            }
        }

        // Trailing functions transform whole matches; anything after one has
        // nothing well-defined to select from.
        if let Some(at) = tokens
            .iter()
            .position(|t| matches!(t, Token::Function(_)))
        {
            if at != tokens.len() - 1 {
                return Err(stream.error("a function call must terminate the path"));
            }
        }
        Ok(tokens)
    }

    fn read_next_token(
        &self,
        stream: &mut TokenStream,
        tokens: &mut Vec<Token>,
        depth: usize,
    ) -> JsonQueryResult<()> {
        match stream.peek() {
            Some(&OPEN_SQUARE_BRACKET) => {
                let r = self.read_bracket_property_token(stream, tokens)?
                    || self.read_array_token(stream, tokens)?
                    || self.read_wildcard_token(stream, tokens)?
                    || self.read_filter_token(stream, tokens, depth)?;
                if !r {
                    return Err(stream.error("invalid selector in brackets"));
                }
                Ok(())
            }
            Some(&PERIOD) => self.read_dot_token(stream, tokens, depth),
            Some(&WILDCARD) => {
                self.read_wildcard_token(stream, tokens)?;
                Ok(())
            }
            Some(_) => self.read_property_or_function_token(stream, tokens),
            None => Err(stream.error("unexpected end of jsonpath")),
        }
    }

    fn read_dot_token(
        &self,
        stream: &mut TokenStream,
        tokens: &mut Vec<Token>,
        depth: usize,
    ) -> JsonQueryResult<()> {
        stream.next();
        match stream.peek() {
            Some(&PERIOD) => {
                stream.next();
                tokens.push(Token::Scan(ScanPathToken {}));
                if stream.peek() == Some(&PERIOD) {
                    return Err(stream.error("unexpected '.' in the jsonpath"));
                }
                self.read_next_token(stream, tokens, depth)
            }
            None => Err(stream.error("the jsonpath must not end with a '.'")),
            _ => self.read_next_token(stream, tokens, depth),
        }
    }

    fn read_property_or_function_token(
        &self,
        stream: &mut TokenStream,
        tokens: &mut Vec<Token>,
    ) -> JsonQueryResult<()> {
        let start = stream.pos();
        let mut name = String::new();
        while let Some(c) = stream.peek() {
            if self.is_bare_name_char(c) {
                name.push(*c);
                stream.next();
            } else {
                break;
            }
        }
        if name.is_empty() {
            return Err(stream.error("expected a property name"));
        }
        if stream.peek() == Some(&OPEN_PARENTHESIS) {
            stream.next();
            match stream.peek_significant() {
                Some(&CLOSE_PARENTHESIS) => {
                    stream.next();
                }
                _ => {
                    return Err(stream.error("path functions take no arguments"));
                }
            }
            let function = PathFunction::from_name(&name).ok_or_else(|| {
                JsonQueryError::path_syntax(start, format!("unknown function '{}'", name))
            })?;
            tokens.push(Token::Function(FunctionPathToken { function }));
        } else {
            tokens.push(Token::Property(PropertyPathToken {
                properties: vec![name],
            }));
        }
        Ok(())
    }

    /// `['name']`, `['a','b']`, and mixed unions that start with a name.
    fn read_bracket_property_token(
        &self,
        stream: &mut TokenStream,
        tokens: &mut Vec<Token>,
    ) -> JsonQueryResult<bool> {
        match self.first_in_bracket(stream) {
            Some(c) if c == SINGLE_QUOTE || c == DOUBLE_QUOTE => {}
            _ => return Ok(false),
        }
        tokens.push(self.read_bracket_selector(stream)?);
        Ok(true)
    }

    /// `[0]`, `[0,2]`, `[1:3]`, `[::2]`, and mixed unions that start with an
    /// index or slice.
    fn read_array_token(
        &self,
        stream: &mut TokenStream,
        tokens: &mut Vec<Token>,
    ) -> JsonQueryResult<bool> {
        match self.first_in_bracket(stream) {
            Some(c) if c.is_ascii_digit() || c == MINUS || c == SPLIT => {}
            _ => return Ok(false),
        }
        tokens.push(self.read_bracket_selector(stream)?);
        Ok(true)
    }

    fn read_wildcard_token(
        &self,
        stream: &mut TokenStream,
        tokens: &mut Vec<Token>,
    ) -> JsonQueryResult<bool> {
        match stream.peek() {
            Some(&WILDCARD) => {
                stream.next();
            }
            Some(&OPEN_SQUARE_BRACKET) => {
                if self.first_in_bracket(stream) != Some(WILDCARD) {
                    return Ok(false);
                }
                stream.next();
                stream.drop_while(|c| c.is_whitespace());
                stream.next(); // the '*'
                match stream.next_significant() {
                    Some(CLOSE_SQUARE_BRACKET) => {}
                    _ => return Err(stream.error("expected ']' after '*'")),
                }
            }
            _ => return Ok(false),
        }
        tokens.push(Token::Wildcard(WildcardPathToken {}));
        Ok(true)
    }

    fn read_filter_token(
        &self,
        stream: &mut TokenStream,
        tokens: &mut Vec<Token>,
        depth: usize,
    ) -> JsonQueryResult<bool> {
        if self.first_in_bracket(stream) != Some(BEGIN_FILTER) {
            return Ok(false);
        }
        stream.next();
        stream.drop_while(|c| c.is_whitespace());
        stream.next(); // the '?'
        let filter = filter::read_filter(self, stream, depth)?;
        tokens.push(Token::Predicate(PredicatePathToken { filter }));
        Ok(true)
    }

    /// Parses a full bracket selector into one token, classifying the member
    /// list: all names become a property union, all indexes an index union,
    /// a single slice a slice token, and anything mixed a general union.
    fn read_bracket_selector(&self, stream: &mut TokenStream) -> JsonQueryResult<Token> {
        stream.next(); // the '['
        let mut members = Vec::new();
        loop {
            members.push(self.read_union_member(stream)?);
            match stream.next_significant() {
                Some(COMMA) => continue,
                Some(CLOSE_SQUARE_BRACKET) => break,
                _ => return Err(stream.error("expected ',' or ']'")),
            }
        }
        Ok(self.classify_members(members))
    }

    fn read_union_member(&self, stream: &mut TokenStream) -> JsonQueryResult<UnionMember> {
        match stream.peek_significant() {
            Some(c) if *c == SINGLE_QUOTE || *c == DOUBLE_QUOTE => {
                let name = stream.read_quoted_string()?;
                Ok(UnionMember::Name(name))
            }
            Some(c) if c.is_ascii_digit() || *c == MINUS || *c == SPLIT => {
                let start = if *c == SPLIT {
                    None
                } else {
                    Some(stream.read_int()?)
                };
                if stream.peek_significant() != Some(&SPLIT) {
                    return match start {
                        Some(index) => Ok(UnionMember::Index(index)),
                        None => Err(stream.error("expected slice bounds")),
                    };
                }
                stream.next();
                let end = match stream.peek_significant() {
                    Some(c) if c.is_ascii_digit() || *c == MINUS => Some(stream.read_int()?),
                    _ => None,
                };
                let step = if stream.peek_significant() == Some(&SPLIT) {
                    stream.next();
                    match stream.peek_significant() {
                        Some(c) if c.is_ascii_digit() || *c == MINUS => {
                            let step = stream.read_int()?;
                            if step == 0 {
                                return Err(stream.error("slice step must not be zero"));
                            }
                            Some(step)
                        }
                        _ => None,
                    }
                } else {
                    None
                };
                Ok(UnionMember::Slice { start, end, step })
            }
            _ => Err(stream.error("invalid bracket member")),
        }
    }

    fn classify_members(&self, members: Vec<UnionMember>) -> Token {
        let all_names = members.iter().all(|m| matches!(m, UnionMember::Name(_)));
        if all_names {
            let properties = members
                .into_iter()
                .map(|m| match m {
                    UnionMember::Name(n) => n,
                    _ => unreachable!(),
                })
                .collect();
            return Token::Property(PropertyPathToken { properties });
        }
        let all_indexes = members.iter().all(|m| matches!(m, UnionMember::Index(_)));
        if all_indexes {
            let indexes = members
                .into_iter()
                .map(|m| match m {
                    UnionMember::Index(i) => i,
                    _ => unreachable!(),
                })
                .collect();
            return Token::ArrayIndex(ArrayIndexPathToken { indexes });
        }
        if members.len() == 1 {
            if let UnionMember::Slice { start, end, step } = members[0] {
                return Token::ArraySlice(ArraySlicePathToken { start, end, step });
            }
        }
        Token::Union(UnionPathToken { members })
    }

    /// First non-whitespace char after an opening bracket, without consuming
    /// anything. Decides which bracket reader owns the selector.
    fn first_in_bracket(&self, stream: &mut TokenStream) -> Option<char> {
        if stream.peek() != Some(&OPEN_SQUARE_BRACKET) {
            return None;
        }
        let mut n = 1;
        loop {
            match stream.peek_ahead(n) {
                Some(c) if c.is_whitespace() => n += 1,
                other => return other,
            }
        }
    }

    fn is_root_path_char(&self, c: &char) -> bool {
        *c == DOC_CONTEXT || *c == EVAL_CONTEXT
    }

    fn is_bare_name_char(&self, c: &char) -> bool {
        c.is_alphanumeric() || *c == '_' || *c == MINUS || *c == DOC_CONTEXT || !c.is_ascii()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn tokenize(path: &str) -> JsonQueryResult<Vec<Token>> {
        Tokenizer::new().tokenize(path)
    }

    #[test]
    fn tokenizes_root_only() {
        let tokens = tokenize("$").unwrap();
        assert_eq!(
            vec![Token::Root(RootPathToken {
                root_path_char: '$'
            })],
            tokens
        );
    }

    #[test]
    fn tokenizes_dot_and_bracket_properties() {
        let tokens = tokenize("$.data['msg']").unwrap();
        assert_eq!(3, tokens.len());
        assert_eq!(
            Token::Property(PropertyPathToken {
                properties: vec!["data".to_string()]
            }),
            tokens[1]
        );
        assert_eq!(
            Token::Property(PropertyPathToken {
                properties: vec!["msg".to_string()]
            }),
            tokens[2]
        );
    }

    #[test]
    fn tokenizes_property_unions() {
        let tokens = tokenize("$['a','b']").unwrap();
        assert_eq!(
            Token::Property(PropertyPathToken {
                properties: vec!["a".to_string(), "b".to_string()]
            }),
            tokens[1]
        );
    }

    #[test]
    fn tokenizes_scan_and_wildcard() {
        let tokens = tokenize("$..items[*].*").unwrap();
        assert!(matches!(tokens[1], Token::Scan(_)));
        assert!(matches!(tokens[2], Token::Property(_)));
        assert!(matches!(tokens[3], Token::Wildcard(_)));
        assert!(matches!(tokens[4], Token::Wildcard(_)));
    }

    #[test]
    fn tokenizes_indexes_and_slices() {
        let tokens = tokenize("$[0,2][-1][1:3][::2]").unwrap();
        assert_eq!(
            Token::ArrayIndex(ArrayIndexPathToken {
                indexes: vec![0, 2]
            }),
            tokens[1]
        );
        assert_eq!(
            Token::ArrayIndex(ArrayIndexPathToken { indexes: vec![-1] }),
            tokens[2]
        );
        assert_eq!(
            Token::ArraySlice(ArraySlicePathToken {
                start: Some(1),
                end: Some(3),
                step: None
            }),
            tokens[3]
        );
        assert_eq!(
            Token::ArraySlice(ArraySlicePathToken {
                start: None,
                end: None,
                step: Some(2)
            }),
            tokens[4]
        );
    }

    #[test]
    fn tokenizes_mixed_unions() {
        let tokens = tokenize("$['name', 0, 1:3]").unwrap();
        match &tokens[1] {
            Token::Union(UnionPathToken { members }) => {
                assert_eq!(3, members.len());
                assert_eq!(UnionMember::Name("name".to_string()), members[0]);
                assert_eq!(UnionMember::Index(0), members[1]);
            }
            other => panic!("expected union, got {:?}", other),
        }
    }

    #[test]
    fn tokenizes_tail_functions() {
        let tokens = tokenize("$.book.length()").unwrap();
        assert_eq!(
            Token::Function(FunctionPathToken {
                function: PathFunction::Length
            }),
            tokens[2]
        );
        assert!(tokenize("$.book.length().x").is_err());
        assert!(tokenize("$.book.frobnicate()").is_err());
    }

    #[test]
    fn tokenizes_filters() {
        let tokens = tokenize("$.items[?(@.price > 10 && @.name == 'x')]").unwrap();
        assert!(matches!(tokens[2], Token::Predicate(_)));
        let tokens = tokenize("$.items[? @.ok ]").unwrap();
        assert!(matches!(tokens[2], Token::Predicate(_)));
    }

    #[test]
    fn rejects_malformed_paths() {
        assert!(tokenize("data.msg").is_err());
        assert!(tokenize("$.").is_err());
        assert!(tokenize("$...msg").is_err());
        assert!(tokenize("$['unclosed").is_err());
        assert!(tokenize("$[1:3:0]").is_err());
        assert!(tokenize("$ extra").is_err());
        assert!(tokenize("$.items[?(@.x >)]").is_err());
    }

    #[test]
    fn nested_filter_parsing_is_bounded() {
        let mut path = String::from("$");
        for _ in 0..200 {
            path.push_str("[?(@");
        }
        assert!(matches!(
            tokenize(&path),
            Err(JsonQueryError::DepthExceeded(_))
        ));
    }

    #[test]
    fn syntax_errors_carry_offsets() {
        match tokenize("$.") {
            Err(JsonQueryError::PathSyntax { offset, .. }) => assert_eq!(2, offset),
            other => panic!("expected syntax error, got {:?}", other),
        }
    }
}
