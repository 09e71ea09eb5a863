#![forbid(unsafe_code)]
pub mod access;
pub mod ast;
pub mod ctype;
pub mod descriptor;
pub mod error;
pub mod lexer;
pub mod ops;
pub mod parser;


use log::debug;

pub use access::DebugAccess;
pub use ast::{AstNode, EvalContext};
pub use ctype::{parse_type_string, CType, TypeKind};
pub use descriptor::{Member, Storage, SymbolDescriptor};
pub use error::{EvalError, EvalResult};
pub use lexer::{Token, TokenKind};
pub use ops::{BinOp, UnaryOp};

/// One C-like expression bound to a debuggee.
///
/// ```no_run
/// # fn demo(data: &mut dyn cdbg_expr::DebugAccess) -> cdbg_expr::EvalResult<()> {
/// let mut expr = cdbg_expr::Expression::new("p->x + arr[2]", data);
/// let result = expr.eval(false)?;
/// println!("{}", result.display(expr.data())?);
/// # Ok(())
/// # }
/// ```
pub struct Expression<'a> {
    source: String,
    data: &'a mut dyn DebugAccess,
}

impl<'a> Expression<'a> {
    pub fn new(source: impl Into<String>, data: &'a mut dyn DebugAccess) -> Self {
        Expression {
            source: source.into(),
            data,
        }
    }

    /// Lex, parse and evaluate the expression. `assignment_allowed`
    /// gates `=` and the compound assignments for this call only.
    pub fn eval(&mut self, assignment_allowed: bool) -> EvalResult<SymbolDescriptor> {
        debug!(
            "evaluating {:?} (assignment {})",
            self.source,
            if assignment_allowed { "allowed" } else { "denied" },
        );
        let ast = parse(&self.source)?;
        eval_ast(&ast, self.data, assignment_allowed)
    }

    /// The bound debuggee port, for follow-up formatting calls.
    pub fn data(&mut self) -> &mut dyn DebugAccess {
        self.data
    }
}

/// Tokenize a source string. Deterministic and independent of any
/// debuggee.
pub fn lex(source: &str) -> EvalResult<Vec<Token>> {
    lexer::lex(source)
}

/// Parse a source string into an expression tree without evaluating
/// it. Hosts can cache the tree and run it repeatedly with
/// [`eval_ast`].
pub fn parse(source: &str) -> EvalResult<AstNode> {
    parser::parse_tokens(lexer::lex(source)?)
}

/// Evaluate a parsed tree against a debuggee.
pub fn eval_ast(
    ast: &AstNode,
    data: &mut dyn DebugAccess,
    assignment_allowed: bool,
) -> EvalResult<SymbolDescriptor> {
    let mut ctx = EvalContext {
        data,
        assignment_allowed,
    };
    ast::evaluate(ast, &mut ctx)
}
