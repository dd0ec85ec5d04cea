use crate::{expr::Expr, visitor::ExprVisitor};

/// Renders a tree in prefix notation, e.g. `(+ 1 (* a b))`. Literals are
/// printed as they were written.
pub struct AstPrinter;

impl ExprVisitor<String> for AstPrinter {
    fn visit_expr(&self, e: &Expr) -> String {
        match e {
            Expr::Literal(literal) => literal.raw.clone(),
            Expr::Identifier(name) => name.clone(),
            Expr::Unary(operator, operand) => {
                format!("({} {})", operator, self.visit_expr(operand))
            }
            Expr::Binary(left, operator, right) => {
                format!(
                    "({} {} {})",
                    operator,
                    self.visit_expr(left),
                    self.visit_expr(right),
                )
            }
            Expr::Paren(inner) => format!("(group {})", self.visit_expr(inner)),
            Expr::Index(base, index) => {
                format!("(index {} {})", self.visit_expr(base), self.visit_expr(index))
            }
            Expr::Member(base, name) => format!("(. {} {})", self.visit_expr(base), name),
        }
    }
}
