//! Recursive-descent parser (§4.A): turns a token stream into a `DslProgram`.
//! Grounded in the distilled source's `DSLTransformer`/`DSLParser` (same
//! declaration shapes: `SOURCE "id" { ... }`, `OBLIGATION "id" { ... }`,
//! `CONSTRAINT "id" { ... }`, `IMPORT "path"`), re-expressed as a hand-written
//! parser since no grammar-file crate is used anywhere in the surrounding code.

use crate::ast::{ConstraintNode, DslProgram, ImportNode, ObligationNode, SourceNode};
use crate::error::DslError;
use crate::lexer::{Token, TokenKind};
use chrono::NaiveDate;

enum FieldValue {
    Str(String),
    Date(NaiveDate),
    Bool(bool),
    List(Vec<String>),
}

pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn advance(&mut self) -> Token {
        let t = self.tokens[self.pos].clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        t
    }

    fn err(&self, message: impl Into<String>) -> DslError {
        let t = self.peek();
        DslError::Parse { line: t.line, col: t.col, message: message.into() }
    }

    fn expect_ident(&mut self, expected: &str) -> Result<(), DslError> {
        match self.advance().kind {
            TokenKind::Ident(ref s) if s == expected => Ok(()),
            other => Err(self.err(format!("expected '{expected}', got {other:?}"))),
        }
    }

    fn expect_string(&mut self) -> Result<String, DslError> {
        match self.advance().kind {
            TokenKind::String(s) => Ok(s),
            other => Err(self.err(format!("expected a string literal, got {other:?}"))),
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), DslError> {
        let got = self.advance().kind;
        if std::mem::discriminant(&got) == std::mem::discriminant(kind) {
            Ok(())
        } else {
            Err(self.err(format!("expected {kind:?}, got {got:?}")))
        }
    }

    fn parse_field_value(&mut self) -> Result<FieldValue, DslError> {
        match self.advance().kind {
            TokenKind::String(s) => Ok(FieldValue::Str(s)),
            TokenKind::Date(d) => Ok(FieldValue::Date(d)),
            TokenKind::Ident(s) if s == "true" => Ok(FieldValue::Bool(true)),
            TokenKind::Ident(s) if s == "false" => Ok(FieldValue::Bool(false)),
            TokenKind::Ident(s) => Ok(FieldValue::Str(s)),
            TokenKind::LBracket => {
                let mut items = Vec::new();
                loop {
                    if matches!(self.peek().kind, TokenKind::RBracket) {
                        self.advance();
                        break;
                    }
                    let item = match self.advance().kind {
                        TokenKind::String(s) => s,
                        TokenKind::Ident(s) => s,
                        other => return Err(self.err(format!("expected list item, got {other:?}"))),
                    };
                    items.push(item);
                    if matches!(self.peek().kind, TokenKind::Comma) {
                        self.advance();
                    }
                }
                Ok(FieldValue::List(items))
            }
            other => Err(self.err(format!("unexpected value token {other:?}"))),
        }
    }

    fn parse_field(&mut self) -> Result<(String, FieldValue), DslError> {
        let key = match self.advance().kind {
            TokenKind::Ident(s) => s,
            other => return Err(self.err(format!("expected field name, got {other:?}"))),
        };
        self.expect(&TokenKind::Colon)?;
        let value = self.parse_field_value()?;
        if matches!(self.peek().kind, TokenKind::Comma) {
            self.advance();
        }
        Ok((key, value))
    }

    fn parse_source(&mut self) -> Result<SourceNode, DslError> {
        let line = self.peek().line;
        self.expect_ident("SOURCE")?;
        let id = self.expect_string()?;
        self.expect(&TokenKind::LBrace)?;
        let mut node = SourceNode { id, line, ..Default::default() };
        while !matches!(self.peek().kind, TokenKind::RBrace) {
            let (key, value) = self.parse_field()?;
            match (key.as_str(), value) {
                ("jurisdiction", FieldValue::Str(s)) => node.jurisdiction = Some(s),
                ("instrument", FieldValue::Str(s)) => node.instrument = Some(s),
                ("effective_date", FieldValue::Date(d)) => node.effective_date = Some(d),
                ("title", FieldValue::Str(s)) => node.title = Some(s),
                (other, _) => return Err(self.err(format!("unknown SOURCE field '{other}'"))),
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(node)
    }

    fn parse_obligation(&mut self) -> Result<ObligationNode, DslError> {
        let line = self.peek().line;
        self.expect_ident("OBLIGATION")?;
        let id = self.expect_string()?;
        self.expect(&TokenKind::LBrace)?;
        let mut node = ObligationNode { id, line, ..Default::default() };
        while !matches!(self.peek().kind, TokenKind::RBrace) {
            let (key, value) = self.parse_field()?;
            match (key.as_str(), value) {
                ("title", FieldValue::Str(s)) => node.title = Some(s),
                ("jurisdiction", FieldValue::Str(s)) => node.jurisdiction = Some(s),
                ("mandatory", FieldValue::Bool(b)) => node.mandatory = b,
                ("required_evidence_types", FieldValue::List(l)) => node.required_evidence_types = l,
                ("allowed_transformations", FieldValue::List(l)) => node.allowed_transformations = l,
                ("forbidden_transformations", FieldValue::List(l)) => node.forbidden_transformations = l,
                ("required_time_scope", FieldValue::Str(s)) => node.required_time_scope = Some(s),
                ("allowed_output_types", FieldValue::List(l)) => node.allowed_output_types = l,
                ("sources", FieldValue::List(l)) => node.sources = l,
                ("allow_absence_statement", FieldValue::Bool(b)) => node.allow_absence_statement = b,
                (other, _) => return Err(self.err(format!("unknown OBLIGATION field '{other}'"))),
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(node)
    }

    fn parse_constraint(&mut self) -> Result<ConstraintNode, DslError> {
        let line = self.peek().line;
        self.expect_ident("CONSTRAINT")?;
        let id = self.expect_string()?;
        self.expect(&TokenKind::LBrace)?;
        let mut node = ConstraintNode { id, line, ..Default::default() };
        while !matches!(self.peek().kind, TokenKind::RBrace) {
            let (key, value) = self.parse_field()?;
            match (key.as_str(), value) {
                ("severity", FieldValue::Str(s)) => node.severity = s,
                ("trigger", FieldValue::Str(s)) => node.trigger = Some(s),
                ("if", FieldValue::Str(s)) => node.condition = Some(s),
                ("then", FieldValue::Str(s)) => node.action = Some(s),
                ("sources", FieldValue::List(l)) => node.sources = l,
                ("jurisdiction", FieldValue::Str(s)) => node.jurisdiction = Some(s),
                (other, _) => return Err(self.err(format!("unknown CONSTRAINT field '{other}'"))),
            }
        }
        self.expect(&TokenKind::RBrace)?;
        Ok(node)
    }

    fn parse_import(&mut self) -> Result<ImportNode, DslError> {
        let line = self.peek().line;
        self.expect_ident("IMPORT")?;
        let path = self.expect_string()?;
        Ok(ImportNode { path, line })
    }

    pub fn parse_program(&mut self) -> Result<DslProgram, DslError> {
        let mut program = DslProgram::default();
        loop {
            match self.peek().kind.clone() {
                TokenKind::Eof => break,
                TokenKind::Ident(ref kw) if kw == "SOURCE" => program.sources.push(self.parse_source()?),
                TokenKind::Ident(ref kw) if kw == "OBLIGATION" => program.obligations.push(self.parse_obligation()?),
                TokenKind::Ident(ref kw) if kw == "CONSTRAINT" => program.constraints.push(self.parse_constraint()?),
                TokenKind::Ident(ref kw) if kw == "IMPORT" => program.imports.push(self.parse_import()?),
                other => return Err(self.err(format!("expected a top-level declaration, got {other:?}"))),
            }
        }
        Ok(program)
    }
}

pub fn parse(input: &str) -> Result<DslProgram, DslError> {
    let tokens = crate::lexer::lex(input)?;
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_one_of_each_declaration() {
        let src = r#"
            SOURCE "src-1" {
                jurisdiction: EU
                instrument: "Regulation (EU) 2017/745"
                effective_date: 2021-05-26
                title: "MDR"
            }

            OBLIGATION "OB-1" {
                title: "Report sales volume"
                jurisdiction: EU
                mandatory: true
                required_evidence_types: [sales_volume]
                allowed_transformations: [summarize, cite]
                forbidden_transformations: [invent]
                allowed_output_types: [narrative]
                sources: ["src-1"]
            }

            CONSTRAINT "C-1" {
                severity: BLOCK
                trigger: "on_proposal_submit"
                if: "evidence changed"
                then: "re-adjudicate"
                sources: ["src-1"]
            }

            IMPORT "shared.psur"
        "#;
        let program = parse(src).unwrap();
        assert_eq!(program.sources.len(), 1);
        assert_eq!(program.obligations.len(), 1);
        assert_eq!(program.constraints.len(), 1);
        assert_eq!(program.imports.len(), 1);
        assert_eq!(program.obligations[0].required_evidence_types, vec!["sales_volume"]);
        assert!(program.obligations[0].mandatory);
    }

    #[test]
    fn rejects_unknown_field() {
        let src = r#"SOURCE "s" { nonsense: "x" }"#;
        assert!(parse(src).is_err());
    }
}
