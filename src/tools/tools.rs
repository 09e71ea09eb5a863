mod demo;
use demo::DemoDebugger;

use anyhow::Result;
use clap::{Parser, Subcommand};

use cdbg_expr::Expression;

/// Evaluate C-like debugger expressions against a built-in demo
/// debuggee image
#[derive(Clone, Debug, Parser)]
struct Args {
    /// permit `=` and compound assignments to write into the debuggee
    #[arg(short, long)]
    allow_assignment: bool,
    // operation to execute
    #[command(subcommand)]
    operation: Operation,
}

#[derive(Clone, Debug, Subcommand)]
enum Operation {
    /// Dump the token stream
    Lex { expr: String },
    /// Dump the parsed expression tree
    Parse { expr: String },
    /// Evaluate the expression and print the resulting value
    Eval { expr: String },
    /// Evaluate the expression and print the C type of the result
    TypeOf { expr: String },
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let mut data = DemoDebugger::new();

    match &args.operation {
        Operation::Lex { expr } => {
            for token in cdbg_expr::lex(expr)? {
                println!("{:>4}  {:?} {:?}", token.at, token.kind, token.text);
            }
        }
        Operation::Parse { expr } => {
            println!("{:#?}", cdbg_expr::parse(expr)?);
        }
        Operation::Eval { expr } => {
            let mut expression = Expression::new(expr.clone(), &mut data);
            let result = expression.eval(args.allow_assignment)?;
            println!("{}", result.display(expression.data())?);
        }
        Operation::TypeOf { expr } => {
            let mut expression = Expression::new(expr.clone(), &mut data);
            let result = expression.eval(args.allow_assignment)?;
            println!("{}", result.type_of());
        }
    }
    Ok(())
}
