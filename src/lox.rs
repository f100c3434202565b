use std::io::Write;

use log::{debug, info};

use crate::ast::ExprIdGen;
use crate::error::Reporter;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::token::Token;

/// The whole pipeline behind one handle: scan → parse → resolve → interpret.
///
/// Holds the state that must survive successive `run` calls so the REPL keeps
/// its definitions: the interpreter (globals and depth table), the expression
/// id generator, and the error flags.
///
/// # Example
///
/// ```rust
/// use treelox::lox::Lox;
///
/// let mut output: Vec<u8> = Vec::new();
/// {
///     let mut lox = Lox::new(&mut output);
///     lox.run(b"fun twice(x) { return x + x; }");
///     lox.run(b"print twice(21);");
///     assert!(!lox.had_error());
/// }
/// assert_eq!(output, b"42\n");
/// ```
pub struct Lox<W: Write> {
    interpreter: Interpreter<W>,
    ids: ExprIdGen,
    reporter: Reporter,
}

impl<W: Write> Lox<W> {
    pub fn new(out: W) -> Self {
        Lox {
            interpreter: Interpreter::new(out),
            ids: ExprIdGen::new(),
            reporter: Reporter::new(),
        }
    }

    /// Run one source buffer.  Diagnostics go to the reporter; a stage with
    /// compile-time errors stops the pipeline before interpretation.
    pub fn run(&mut self, source: &[u8]) {
        info!("Running {} byte(s) of source", source.len());

        let mut tokens: Vec<Token> = Vec::new();

        for item in Scanner::new(source) {
            match item {
                Ok(token) => tokens.push(token),
                Err(err) => self.reporter.report(&err),
            }
        }

        let mut parser = Parser::new(tokens, &mut self.ids);
        let statements = parser.parse();

        for err in parser.take_diagnostics() {
            self.reporter.report(&err);
        }

        if self.reporter.had_error() {
            debug!("Skipping resolution: compile-time errors present");
            return;
        }

        let mut resolver = Resolver::new(&mut self.interpreter);
        resolver.resolve(&statements);

        for err in resolver.take_diagnostics() {
            self.reporter.report(&err);
        }

        if self.reporter.had_error() {
            debug!("Skipping interpretation: resolve errors present");
            return;
        }

        if let Err(err) = self.interpreter.interpret(&statements) {
            self.reporter.report(&err);
        }
    }

    pub fn had_error(&self) -> bool {
        self.reporter.had_error()
    }

    pub fn had_runtime_error(&self) -> bool {
        self.reporter.had_runtime_error()
    }

    /// The REPL forgives compile-time errors between prompts.
    pub fn clear_error(&mut self) {
        self.reporter.clear_error();
    }
}
