//! Recursive descent object builder
//!
//! Consumes the token stream and populates generic maps and sequences or beans, asking the
//! [`TypeResolver`] which type to instantiate for every nested object and array.

use std::sync::Arc;

use log::trace;

use super::{
    path::{PathContext, Segment},
    Literal, ParseError, ParserSettings, SyntaxError, SyntaxErrorKind, Token, TokenKind,
    Tokenizer, TypeResolver,
};
use crate::{
    bean::{Bean, DescriptorCache, TargetType, TypeDescriptor, TypeHint},
    value::{Map, Value},
};

/// Kinds of all tokens which can start a value
pub(crate) const VALUE_START: &[TokenKind] = &[
    TokenKind::BraceOpen,
    TokenKind::BracketOpen,
    TokenKind::String,
    TokenKind::Integer,
    TokenKind::Decimal,
    TokenKind::True,
    TokenKind::False,
    TokenKind::Null,
];

pub(crate) fn next_token(tokenizer: &mut Tokenizer<'_>, path: &str) -> Result<Token, ParseError> {
    tokenizer
        .next_token()
        .map_err(|error| ParseError::LexError {
            error,
            path: path.to_owned(),
        })
}

pub(crate) fn syntax_error(
    tokenizer: &Tokenizer<'_>,
    kind: SyntaxErrorKind,
    token: &Token,
    path: &str,
) -> ParseError {
    ParseError::SyntaxError(SyntaxError {
        kind,
        found: token.kind(),
        location: tokenizer.location(token.offset(), path),
    })
}

pub(crate) fn expect_token(
    tokenizer: &Tokenizer<'_>,
    token: &Token,
    expected: &'static [TokenKind],
    path: &str,
) -> Result<(), ParseError> {
    if expected.contains(&token.kind()) {
        Ok(())
    } else {
        Err(syntax_error(
            tokenizer,
            SyntaxErrorKind::UnexpectedToken { expected },
            token,
            path,
        ))
    }
}

fn literal_value(token: Token) -> Value {
    match token.into_value() {
        Some(Literal::String(s)) => Value::String(s),
        Some(Literal::Integer(i)) => Value::Integer(i),
        Some(Literal::Decimal(d)) => Value::Decimal(d),
        Some(Literal::Bool(b)) => Value::Bool(b),
        Some(Literal::Null) | None => Value::Null,
    }
}

/// Object which is being populated
enum ObjectTarget {
    Map(Map),
    Bean(Box<dyn Bean>, Arc<TypeDescriptor>),
}

/// Where the value of a JSON member goes, determined before the value is parsed
#[derive(PartialEq, Debug)]
enum MemberSink {
    /// Index of a writable property
    Property(usize),
    MapEntry,
    DynamicAttribute,
    /// Index of an accumulator
    Accumulator(usize),
}

/// Parser for a single JSON document
pub(crate) struct Parser<'c, 'j> {
    tokenizer: Tokenizer<'j>,
    resolver: TypeResolver<'c>,
    descriptors: DescriptorCache<'c>,
    max_nesting_depth: u32,
}

impl<'c, 'j> Parser<'c, 'j> {
    pub(crate) fn new(
        json: &'j str,
        resolver: TypeResolver<'c>,
        descriptors: DescriptorCache<'c>,
        settings: &ParserSettings,
    ) -> Self {
        Parser {
            tokenizer: Tokenizer::new(json),
            resolver,
            descriptors,
            max_nesting_depth: settings.max_nesting_depth,
        }
    }

    /// Parses the complete document
    ///
    /// If `target` is `None` the type of the root value is resolved like the type of any
    /// nested value, at the path `""`. `element_hint` is the type hint for the items, respectively
    /// member values, of the root value.
    pub(crate) fn parse_document(
        mut self,
        target: Option<TargetType>,
        element_hint: Option<TypeHint>,
    ) -> Result<Value, ParseError> {
        let opening = self.next("")?;
        if !matches!(
            opening.kind(),
            TokenKind::BraceOpen | TokenKind::BracketOpen
        ) {
            return Err(self.syntax_error(SyntaxErrorKind::NotAContainer, &opening, ""));
        }

        let target = match target {
            Some(target) => target,
            None => self.resolve(&opening, "", None)?,
        };
        let root = PathContext::root(target, element_hint);
        let value = self.parse_container(&root, &opening)?;

        let trailing = self.next("")?;
        if trailing.kind() != TokenKind::End {
            return Err(self.syntax_error(SyntaxErrorKind::TrailingData, &trailing, ""));
        }
        Ok(value)
    }

    fn next(&mut self, path: &str) -> Result<Token, ParseError> {
        next_token(&mut self.tokenizer, path)
    }

    fn expect(
        &self,
        token: &Token,
        expected: &'static [TokenKind],
        path: &str,
    ) -> Result<(), ParseError> {
        expect_token(&self.tokenizer, token, expected, path)
    }

    fn syntax_error(&self, kind: SyntaxErrorKind, token: &Token, path: &str) -> ParseError {
        syntax_error(&self.tokenizer, kind, token, path)
    }

    /// Resolves the type for a nested value whose opening token was just read
    fn resolve(
        &mut self,
        opening: &Token,
        path: &str,
        hint: Option<TargetType>,
    ) -> Result<TargetType, ParseError> {
        self.tokenizer.push_back(opening);
        let target = self
            .resolver
            .resolve(path, &mut self.tokenizer, opening.kind(), hint)?;
        // Consume the opening token again
        let reread = self.next(path)?;
        debug_assert_eq!(opening, &reread);
        Ok(target)
    }

    /// Parses the array or object whose opening token was just read into the container
    /// described by `ctx`
    fn parse_container(
        &mut self,
        ctx: &PathContext<'_>,
        opening: &Token,
    ) -> Result<Value, ParseError> {
        if ctx.depth() > self.max_nesting_depth {
            return Err(self.syntax_error(SyntaxErrorKind::NestingTooDeep, opening, ctx.path()));
        }
        if opening.kind() == TokenKind::BraceOpen {
            self.parse_object(ctx, opening)
        } else {
            self.parse_array(ctx, opening)
        }
    }

    /// Parses a member value or an array item, starting with its first token
    fn parse_value(
        &mut self,
        ctx: &PathContext<'_>,
        first: Token,
        path: &str,
        value_hint: Option<TargetType>,
        element_hint: Option<TypeHint>,
    ) -> Result<Value, ParseError> {
        match first.kind() {
            kind if kind.is_primitive() => Ok(literal_value(first)),
            TokenKind::BraceOpen | TokenKind::BracketOpen => {
                let target = self.resolve(&first, path, value_hint)?;
                let child = ctx.push(path.to_owned(), target, element_hint);
                self.parse_container(&child, &first)
            }
            _ => Err(self.syntax_error(
                SyntaxErrorKind::UnexpectedToken {
                    expected: VALUE_START,
                },
                &first,
                path,
            )),
        }
    }

    /// Parses an array item or a map member value, typed by the member hint of `ctx`
    fn parse_member_value(
        &mut self,
        ctx: &PathContext<'_>,
        first: Token,
        path: &str,
    ) -> Result<Value, ParseError> {
        let hint = ctx.member_hint();
        self.parse_value(
            ctx,
            first,
            path,
            hint.map(TypeHint::target),
            hint.and_then(TypeHint::nested).cloned(),
        )
    }

    fn parse_array(&mut self, ctx: &PathContext<'_>, opening: &Token) -> Result<Value, ParseError> {
        if ctx.container() != TargetType::Sequence {
            return Err(self.syntax_error(
                SyntaxErrorKind::ArrayIntoNonSequence,
                opening,
                ctx.path(),
            ));
        }

        let item_path = ctx.child_path(Segment::Element);
        let mut items = Vec::new();
        loop {
            let mut token = self.next(ctx.path())?;
            if token.kind() == TokenKind::BracketClose {
                break;
            }
            if !items.is_empty() {
                self.expect(
                    &token,
                    &[TokenKind::Comma, TokenKind::BracketClose],
                    ctx.path(),
                )?;
                token = self.next(ctx.path())?;
            }
            let item = self.parse_member_value(ctx, token, &item_path)?;
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn parse_object(&mut self, ctx: &PathContext<'_>, opening: &Token) -> Result<Value, ParseError> {
        let mut target = match ctx.container() {
            TargetType::Map => ObjectTarget::Map(Map::new()),
            TargetType::Bean(bean_type) => {
                let descriptor = self.descriptors.get(bean_type);
                ObjectTarget::Bean(descriptor.create(), descriptor)
            }
            TargetType::Sequence => {
                return Err(self.syntax_error(
                    SyntaxErrorKind::ObjectIntoSequence,
                    opening,
                    ctx.path(),
                ))
            }
        };

        let mut first = true;
        loop {
            let token = self.next(ctx.path())?;
            let expected: &'static [TokenKind] = if first {
                &[TokenKind::String, TokenKind::BraceClose]
            } else {
                &[TokenKind::Comma, TokenKind::BraceClose]
            };
            self.expect(&token, expected, ctx.path())?;
            if token.kind() == TokenKind::BraceClose {
                break;
            }

            let name_token = if first {
                token
            } else {
                let name_token = self.next(ctx.path())?;
                self.expect(&name_token, &[TokenKind::String], ctx.path())?;
                name_token
            };
            let colon = self.next(ctx.path())?;
            self.expect(&colon, &[TokenKind::Colon], ctx.path())?;

            let name = name_token.as_str().unwrap_or_default().to_owned();
            let member_path = ctx.child_path(Segment::Member(&name));
            let sink = self.member_sink(&target, &name, &name_token, &member_path)?;
            trace!("member '{name}' at path '{}' goes to {sink:?}", ctx.path());

            let value_token = self.next(&member_path)?;
            self.populate_member(ctx, &mut target, sink, name, value_token, &member_path)?;
            first = false;
        }

        Ok(match target {
            ObjectTarget::Map(map) => Value::Object(map),
            ObjectTarget::Bean(bean, _) => Value::Bean(bean),
        })
    }

    fn member_sink(
        &self,
        target: &ObjectTarget,
        name: &str,
        name_token: &Token,
        member_path: &str,
    ) -> Result<MemberSink, ParseError> {
        let (bean, descriptor) = match target {
            ObjectTarget::Map(_) => return Ok(MemberSink::MapEntry),
            ObjectTarget::Bean(bean, descriptor) => (bean, descriptor),
        };

        if let Some(index) = descriptor.writable_property_index(name) {
            Ok(MemberSink::Property(index))
        } else if bean.dynamic_attributes().is_some() {
            Ok(MemberSink::DynamicAttribute)
        } else if let Some(index) = descriptor.accumulator_index(name) {
            Ok(MemberSink::Accumulator(index))
        } else {
            Err(ParseError::PropertyError {
                name: name.to_owned(),
                target: descriptor.name().to_owned(),
                location: self.tokenizer.location(name_token.offset(), member_path),
            })
        }
    }

    fn populate_member(
        &mut self,
        ctx: &PathContext<'_>,
        target: &mut ObjectTarget,
        sink: MemberSink,
        name: String,
        value_token: Token,
        member_path: &str,
    ) -> Result<(), ParseError> {
        let value_offset = value_token.offset();

        match (target, sink) {
            (ObjectTarget::Map(map), _) => {
                let value = self.parse_member_value(ctx, value_token, member_path)?;
                map.insert(name, value);
            }
            (ObjectTarget::Bean(bean, descriptor), MemberSink::Property(index)) => {
                let property = &descriptor.properties()[index];
                let value = self.parse_value(
                    ctx,
                    value_token,
                    member_path,
                    property.value_hint(),
                    property.element_hint().cloned(),
                )?;
                property.set(bean.as_mut(), value).map_err(|error| {
                    ParseError::ConversionError {
                        name: Some(name),
                        error,
                        location: self.tokenizer.location(value_offset, member_path),
                    }
                })?;
            }
            (ObjectTarget::Bean(bean, descriptor), MemberSink::DynamicAttribute) => {
                let value = self.parse_member_value(ctx, value_token, member_path)?;
                match bean.dynamic_attributes_mut() {
                    Some(attributes) => attributes.set_attribute(&name, value),
                    None => {
                        return Err(ParseError::PropertyError {
                            name,
                            target: descriptor.name().to_owned(),
                            location: self.tokenizer.location(value_offset, member_path),
                        })
                    }
                }
            }
            (ObjectTarget::Bean(bean, descriptor), MemberSink::Accumulator(index)) => {
                if value_token.kind() != TokenKind::BracketOpen {
                    return Err(ParseError::PropertyError {
                        name,
                        target: descriptor.name().to_owned(),
                        location: self.tokenizer.location(value_offset, member_path),
                    });
                }
                let accumulator = &descriptor.accumulators()[index];
                let item_path = format!("{member_path}[]");
                let array_ctx = ctx.push(
                    member_path.to_owned(),
                    TargetType::Sequence,
                    accumulator.element_hint().cloned(),
                );
                let items = match self.parse_container(&array_ctx, &value_token)? {
                    Value::Array(items) => items,
                    other => vec![other],
                };
                for item in items {
                    accumulator.add(bean.as_mut(), item).map_err(|error| {
                        ParseError::ConversionError {
                            name: None,
                            error,
                            location: self.tokenizer.location(value_offset, &item_path),
                        }
                    })?;
                }
            }
            (ObjectTarget::Bean(..), MemberSink::MapEntry) => {
                unreachable!("map sink is only used for maps")
            }
        }
        Ok(())
    }
}
