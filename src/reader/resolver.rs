//! Resolution of the type to instantiate for nested JSON objects and arrays

use std::collections::HashMap;

use log::{debug, trace};

use super::{
    parser::{expect_token, next_token, syntax_error, VALUE_START},
    ParseError, SyntaxErrorKind, Token, TokenKind, Tokenizer,
};
use crate::bean::TargetType;

/// Maps exact structural paths to the type which should be instantiated there
///
/// Paths use the notation described in [`path`](super::path), for example `.rows[].value`.
/// There is no wildcard or prefix matching.
#[derive(Clone, Default, Debug)]
pub struct TypeHintTable {
    hints: HashMap<String, TargetType>,
}

impl TypeHintTable {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        TypeHintTable::default()
    }

    /// Adds a hint, returning the previous hint for the same path
    pub fn insert(&mut self, path: impl Into<String>, target: TargetType) -> Option<TargetType> {
        self.hints.insert(path.into(), target)
    }

    /// Removes the hint for a path
    pub fn remove(&mut self, path: &str) -> Option<TargetType> {
        self.hints.remove(path)
    }

    /// Gets the hint for a path
    pub fn get(&self, path: &str) -> Option<TargetType> {
        self.hints.get(path).copied()
    }

    #[allow(missing_docs)]
    pub fn len(&self) -> usize {
        self.hints.len()
    }

    #[allow(missing_docs)]
    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

/// Selects the type of a JSON object based on the value of one of its members
///
/// # Examples
/// ```
/// # use jsongraph::{bean::TargetType, reader::DiscriminatorSpec};
/// let spec = DiscriminatorSpec::new("type", true)
///     .with_type("list", TargetType::Sequence)
///     .with_fallback(TargetType::Map);
/// assert_eq!(Some(TargetType::Sequence), spec.type_for("list"));
/// ```
#[derive(Clone, Debug)]
pub struct DiscriminatorSpec {
    field_name: String,
    value_to_type: HashMap<String, TargetType>,
    allow_undefined: bool,
    fallback: TargetType,
}

impl DiscriminatorSpec {
    /// Creates a spec for the discriminator member `field_name`
    ///
    /// `allow_undefined` determines what happens when the discriminator has a value without
    /// mapped type: if `true` the [fallback](Self::with_fallback) type is used, otherwise
    /// parsing fails with [`ParseError::TypeResolutionError`].
    pub fn new(field_name: impl Into<String>, allow_undefined: bool) -> Self {
        DiscriminatorSpec {
            field_name: field_name.into(),
            value_to_type: HashMap::new(),
            allow_undefined,
            fallback: TargetType::Map,
        }
    }

    /// Maps a discriminator value to a type
    pub fn with_type(mut self, value: impl Into<String>, target: TargetType) -> Self {
        self.value_to_type.insert(value.into(), target);
        self
    }

    /// Sets the type used when the object has no discriminator member and no declared type,
    /// or (if undefined values are allowed) when the value has no mapped type; default is
    /// [`TargetType::Map`]
    pub fn with_fallback(mut self, target: TargetType) -> Self {
        self.fallback = target;
        self
    }

    #[allow(missing_docs)]
    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    #[allow(missing_docs)]
    pub fn allow_undefined(&self) -> bool {
        self.allow_undefined
    }

    #[allow(missing_docs)]
    pub fn fallback(&self) -> TargetType {
        self.fallback
    }

    /// Gets the type mapped to a discriminator value
    pub fn type_for(&self, value: &str) -> Option<TargetType> {
        self.value_to_type.get(value).copied()
    }
}

/// The discriminator specs of a codec: an optional codec-wide spec and path-specific specs
/// which take precedence over it
#[derive(Clone, Default, Debug)]
pub struct Discriminators {
    default: Option<DiscriminatorSpec>,
    by_path: HashMap<String, DiscriminatorSpec>,
}

impl Discriminators {
    #[allow(missing_docs)]
    pub fn new() -> Self {
        Discriminators::default()
    }

    /// Sets the spec which applies to all paths without a path-specific spec
    pub fn set_default(&mut self, spec: DiscriminatorSpec) {
        self.default = Some(spec);
    }

    /// Sets the spec for an exact path
    pub fn set_for_path(&mut self, path: impl Into<String>, spec: DiscriminatorSpec) {
        self.by_path.insert(path.into(), spec);
    }

    /// Gets the spec which is active for a path
    pub fn spec_for(&self, path: &str) -> Option<&DiscriminatorSpec> {
        self.by_path.get(path).or(self.default.as_ref())
    }
}

/// Outcome of scanning an object for its discriminator member
#[derive(PartialEq, Debug)]
enum Scan {
    Found(TargetType),
    Absent,
}

/// Picks the concrete type for a nested JSON object or array
///
/// The first applicable rule wins:
/// 1. the [`TypeHintTable`] entry for the exact path
/// 2. for objects, the active [`DiscriminatorSpec`], determined by scanning ahead for the
///    discriminator member; if the object has no such member the rule only applies when
///    there is no declared type (rule 3)
/// 3. the type hint declared by the enclosing container (for example the property type)
/// 4. [`TargetType::Map`] for objects, [`TargetType::Sequence`] for arrays
#[derive(Debug)]
pub struct TypeResolver<'c> {
    type_hints: &'c TypeHintTable,
    discriminators: &'c Discriminators,
}

impl<'c> TypeResolver<'c> {
    #[allow(missing_docs)]
    pub fn new(type_hints: &'c TypeHintTable, discriminators: &'c Discriminators) -> Self {
        TypeResolver {
            type_hints,
            discriminators,
        }
    }

    /// Resolves the type for the value at `path`
    ///
    /// The tokenizer must be positioned in front of the opening `{` or `[` of the value,
    /// whose kind is `opening`. Regardless of the outcome the tokenizer is at that
    /// position again when this method returns.
    pub fn resolve(
        &self,
        path: &str,
        tokenizer: &mut Tokenizer<'_>,
        opening: TokenKind,
        member_hint: Option<TargetType>,
    ) -> Result<TargetType, ParseError> {
        let resolved = if let Some(target) = self.type_hints.get(path) {
            target
        } else if let Some(spec) = self
            .discriminators
            .spec_for(path)
            .filter(|_| opening == TokenKind::BraceOpen)
        {
            let savepoint = tokenizer.mark();
            let scan = self.scan_discriminator(spec, path, tokenizer);
            tokenizer.reset(savepoint);

            match scan? {
                Scan::Found(target) => target,
                Scan::Absent => {
                    debug!("no discriminator '{}' at path '{path}'", spec.field_name);
                    member_hint.unwrap_or(spec.fallback)
                }
            }
        } else if let Some(hint) = member_hint {
            hint
        } else if opening == TokenKind::BraceOpen {
            TargetType::Map
        } else {
            TargetType::Sequence
        };

        debug!("path '{path}' => {resolved}");
        Ok(resolved)
    }

    fn scan_discriminator(
        &self,
        spec: &DiscriminatorSpec,
        path: &str,
        tokenizer: &mut Tokenizer<'_>,
    ) -> Result<Scan, ParseError> {
        let opening = next_token(tokenizer, path)?;
        expect_token(tokenizer, &opening, &[TokenKind::BraceOpen], path)?;

        let mut first = true;
        loop {
            let token = next_token(tokenizer, path)?;
            let expected: &'static [TokenKind] = if first {
                &[TokenKind::String, TokenKind::BraceClose]
            } else {
                &[TokenKind::Comma, TokenKind::BraceClose]
            };
            expect_token(tokenizer, &token, expected, path)?;
            if token.kind() == TokenKind::BraceClose {
                return Ok(Scan::Absent);
            }

            let name = if first {
                token
            } else {
                let name = next_token(tokenizer, path)?;
                expect_token(tokenizer, &name, &[TokenKind::String], path)?;
                name
            };
            let colon = next_token(tokenizer, path)?;
            expect_token(tokenizer, &colon, &[TokenKind::Colon], path)?;
            let value = next_token(tokenizer, path)?;

            if name.as_str() == Some(spec.field_name.as_str()) {
                return self.discriminator_type(spec, path, tokenizer, &value);
            }
            trace!(
                "skipping member {name} while looking for discriminator at path '{path}'"
            );
            skip_value(tokenizer, &value, path)?;
            first = false;
        }
    }

    fn discriminator_type(
        &self,
        spec: &DiscriminatorSpec,
        path: &str,
        tokenizer: &Tokenizer<'_>,
        value: &Token,
    ) -> Result<Scan, ParseError> {
        if let Some(target) = value.as_str().and_then(|v| spec.type_for(v)) {
            debug!(
                "discriminator '{}' at path '{path}' selects {target}",
                spec.field_name
            );
            return Ok(Scan::Found(target));
        }

        if spec.allow_undefined {
            debug!(
                "discriminator '{}' at path '{path}' has undefined value {value}, using fallback",
                spec.field_name
            );
            Ok(Scan::Found(spec.fallback))
        } else {
            let value_text = match value.as_str() {
                Some(s) => s.to_owned(),
                None => value.to_string(),
            };
            Err(ParseError::TypeResolutionError {
                field: spec.field_name.clone(),
                value: value_text,
                location: tokenizer.location(value.offset(), path),
            })
        }
    }
}

/// Skips a complete value whose first token `first` has already been read
///
/// Nested arrays and objects are skipped by tracking the nesting depth only; their content
/// is validated when the value is actually parsed.
fn skip_value(tokenizer: &mut Tokenizer<'_>, first: &Token, path: &str) -> Result<(), ParseError> {
    if first.kind().is_primitive() {
        return Ok(());
    }
    if !matches!(first.kind(), TokenKind::BraceOpen | TokenKind::BracketOpen) {
        return Err(syntax_error(
            tokenizer,
            SyntaxErrorKind::UnexpectedToken {
                expected: VALUE_START,
            },
            first,
            path,
        ));
    }

    let mut depth = 1_u32;
    while depth > 0 {
        let token = next_token(tokenizer, path)?;
        match token.kind() {
            TokenKind::BraceOpen | TokenKind::BracketOpen => depth += 1,
            TokenKind::BraceClose | TokenKind::BracketClose => depth -= 1,
            TokenKind::End => {
                return Err(syntax_error(
                    tokenizer,
                    SyntaxErrorKind::UnexpectedToken {
                        expected: &[TokenKind::BraceClose, TokenKind::BracketClose],
                    },
                    &token,
                    path,
                ))
            }
            _ => {}
        }
    }
    Ok(())
}
