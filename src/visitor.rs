use crate::expr::Expr;

pub trait ExprVisitor<T> {
    fn visit_expr(&self, e: &Expr) -> T;
}
