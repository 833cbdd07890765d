//! Parser for the Bugs language
//!
//! Recursive descent over a [`Lexer`] with one token of pushback. Every
//! `is_*` production returns `Ok(None)` when its first distinguishing token
//! is absent, so the caller may try an alternative. Once that token has been
//! consumed the production is committed and any later mismatch is a fatal
//! [`BugsError::Syntax`] carrying the current line.

use std::sync::Arc;

use crate::dsl::ast::*;
use crate::dsl::lexer::{Lexer, Token, TokenKind};
use crate::error::{BugsError, Result};

/// Parser for the Bugs language
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    /// Create a new parser over the given source text
    pub fn new(source: &str) -> Self {
        Self {
            lexer: Lexer::new(source),
        }
    }

    /// Parse a whole program, requiring end of input after the last bug.
    pub fn parse(&mut self) -> Result<Program> {
        self.is_program()
    }

    /// `program ::= [eol] [allbugs] bug_definition {bug_definition} EOF`
    pub fn is_program(&mut self) -> Result<Program> {
        // leading blank or comment-only lines
        self.is_eol();

        let allbugs = self.is_allbugs_code()?.unwrap_or_default();

        let mut bugs = Vec::new();
        match self.is_bug_definition()? {
            Some(bug) => bugs.push(bug),
            None => return Err(self.error("Error in first bug definition")),
        }
        while let Some(bug) = self.is_bug_definition()? {
            bugs.push(bug);
        }

        if self.next_token_matches(TokenKind::Eof).is_none() {
            return Err(self.error("Error in EOF at end of program"));
        }

        Ok(Program { allbugs, bugs })
    }

    /// `allbugs ::= "Allbugs" "{" eol {var_declaration} {function_definition} "}" eol`
    pub fn is_allbugs_code(&mut self) -> Result<Option<Allbugs>> {
        if !self.keyword("Allbugs") {
            return Ok(None);
        }
        self.expect_symbol("{", "No '{' following 'Allbugs'")?;
        self.expect_eol("Invalid eol following '{'")?;

        let mut variables = Vec::new();
        while let Some(declaration) = self.is_var_declaration()? {
            variables.push(declaration);
        }
        let mut functions = Vec::new();
        while let Some(function) = self.is_function_definition()? {
            functions.push(function);
        }

        self.expect_symbol("}", "Error in closing '}'")?;
        self.expect_eol("Error in final eol")?;

        Ok(Some(Allbugs {
            variables,
            functions,
        }))
    }

    /// ```text
    /// bug_definition ::= "Bug" NAME "{" eol {var_declaration} [initialization_block]
    ///                    command {command} {function_definition} "}" eol
    /// ```
    pub fn is_bug_definition(&mut self) -> Result<Option<BugDefinition>> {
        if !self.keyword("Bug") {
            return Ok(None);
        }
        let name = self
            .name()
            .ok_or_else(|| self.error("Error in Bug definition name"))?;
        self.expect_symbol("{", "'{' not present")?;
        self.expect_eol("Error with eol after '{'")?;

        let mut variables = Vec::new();
        while let Some(declaration) = self.is_var_declaration()? {
            variables.push(declaration);
        }

        let initially = self.is_initialization_block()?.unwrap_or_default();

        let mut statements = match self.is_command()? {
            Some(command) => vec![command],
            None => return Err(self.error("Error in first command of Bug definition")),
        };
        while let Some(command) = self.is_command()? {
            statements.push(command);
        }

        let mut functions = Vec::new();
        while let Some(function) = self.is_function_definition()? {
            functions.push(function);
        }

        self.expect_symbol("}", "Error with final '}'")?;
        self.expect_eol("Error with final eol of Bug Definition")?;

        Ok(Some(BugDefinition {
            name,
            variables,
            initially,
            body: Block::new(statements),
            functions,
        }))
    }

    /// `var_declaration ::= "var" NAME {"," NAME} eol`
    pub fn is_var_declaration(&mut self) -> Result<Option<VarDeclaration>> {
        if !self.keyword("var") {
            return Ok(None);
        }
        let mut names = vec![self
            .name()
            .ok_or_else(|| self.error("Invalid name following 'var'"))?];
        while self.symbol(",") {
            names.push(
                self.name()
                    .ok_or_else(|| self.error("Invalid name following ','"))?,
            );
        }
        self.expect_eol("Error with eol")?;

        Ok(Some(VarDeclaration { names }))
    }

    /// `initialization_block ::= "initially" block`
    pub fn is_initialization_block(&mut self) -> Result<Option<Block>> {
        if !self.keyword("initially") {
            return Ok(None);
        }
        match self.is_block()? {
            Some(block) => Ok(Some(block)),
            None => Err(self.error("Invalid block following 'initially'")),
        }
    }

    /// `function_definition ::= "define" NAME ["using" NAME {"," NAME}] block`
    pub fn is_function_definition(&mut self) -> Result<Option<Arc<FunctionDefinition>>> {
        if !self.keyword("define") {
            return Ok(None);
        }
        let name = self
            .name()
            .ok_or_else(|| self.error("Error in function name"))?;

        let mut parameters = Vec::new();
        if self.keyword("using") {
            parameters.push(
                self.name()
                    .ok_or_else(|| self.error("Error in variable after 'using'"))?,
            );
            while self.symbol(",") {
                parameters.push(self.name().ok_or_else(|| self.error("Error in variable"))?);
            }
        }

        let body = self
            .is_block()?
            .ok_or_else(|| self.error("Error in block after function definition"))?;

        Ok(Some(Arc::new(FunctionDefinition {
            name,
            parameters,
            body,
        })))
    }

    /// `block ::= "{" eol {command} "}" eol`
    pub fn is_block(&mut self) -> Result<Option<Block>> {
        if !self.symbol("{") {
            return Ok(None);
        }
        self.expect_eol("No eol following the '{'")?;

        let mut statements = Vec::new();
        while let Some(command) = self.is_command()? {
            statements.push(command);
        }

        self.expect_symbol("}", "No closing '}'")?;
        self.expect_eol("No final eol")?;

        Ok(Some(Block::new(statements)))
    }

    /// `command ::= action | statement`
    pub fn is_command(&mut self) -> Result<Option<Statement>> {
        if let Some(action) = self.is_action()? {
            return Ok(Some(action));
        }
        self.is_statement()
    }

    /// `action ::= move | moveto | turn | turnto | line`
    pub fn is_action(&mut self) -> Result<Option<Statement>> {
        if self.keyword("move") {
            let distance = self.expect_expression("Invalid expression following 'move'")?;
            self.expect_eol("Error with eol")?;
            return Ok(Some(Statement::Move(distance)));
        }

        if self.keyword("moveto") {
            let x = self.expect_expression("Invalid expression following 'moveto'")?;
            self.expect_symbol(",", "No comma following expression")?;
            let y = self.expect_expression("Invalid expression following ','")?;
            self.expect_eol("Error with eol")?;
            return Ok(Some(Statement::MoveTo { x, y }));
        }

        if self.keyword("turn") {
            let degrees = self.expect_expression("Invalid expression following 'turn'")?;
            self.expect_eol("Error with eol")?;
            return Ok(Some(Statement::Turn(degrees)));
        }

        if self.keyword("turnto") {
            let degrees = self.expect_expression("Invalid expression following 'turnto'")?;
            self.expect_eol("Error with eol")?;
            return Ok(Some(Statement::TurnTo(degrees)));
        }

        if self.keyword("line") {
            let x1 = self.expect_expression("Invalid expression following 'line'")?;
            self.expect_symbol(",", "Missing ',' symbol")?;
            let y1 = self.expect_expression("Invalid expression after ',' symbol")?;
            self.expect_symbol(",", "Missing ',' symbol")?;
            let x2 = self.expect_expression("Invalid expression after ',' symbol")?;
            self.expect_symbol(",", "Missing ',' symbol")?;
            let y2 = self.expect_expression("Invalid expression after ',' symbol")?;
            self.expect_eol("Error with eol")?;
            return Ok(Some(Statement::Line { x1, y1, x2, y2 }));
        }

        Ok(None)
    }

    /// ```text
    /// statement ::= assignment | loop | exit_if | switch | return | do | color
    /// ```
    pub fn is_statement(&mut self) -> Result<Option<Statement>> {
        // assignment: the only statement that starts with a NAME
        if let Some(name) = self.name() {
            self.expect_symbol("=", "Missing '=' after variable")?;
            let value = self.expect_expression("Error in expression")?;
            self.expect_eol("Error in eol")?;
            return Ok(Some(Statement::Assign { name, value }));
        }

        if self.keyword("loop") {
            let body = self
                .is_block()?
                .ok_or_else(|| self.error("Invalid block after 'loop'"))?;
            return Ok(Some(Statement::Loop(body)));
        }

        if self.keyword("exit") {
            if !self.keyword("if") {
                return Err(self.error("'exit' not followed by 'if'"));
            }
            let guard = self.expect_expression("'exit if' not followed by valid expression")?;
            self.expect_eol("Error with eol")?;
            return Ok(Some(Statement::ExitIf(guard)));
        }

        if self.keyword("switch") {
            return self.switch_body().map(Some);
        }

        if self.keyword("return") {
            let value = self.expect_expression("'return' not followed by valid expression")?;
            self.expect_eol("Error with eol")?;
            return Ok(Some(Statement::Return(value)));
        }

        if self.keyword("do") {
            let name = self
                .name()
                .ok_or_else(|| self.error("'do' not followed by a variable"))?;
            let args = self.is_parameter_list()?.unwrap_or_default();
            self.expect_eol("No eol at the end")?;
            return Ok(Some(Statement::Do(Call { name, args })));
        }

        if self.keyword("color") {
            let color = self
                .next_token_matches(TokenKind::Keyword)
                .ok_or_else(|| self.error("Token following 'color' is not a keyword"))?;
            self.expect_eol("No eol at the end of the statement")?;
            return Ok(Some(Statement::Color(color.text)));
        }

        Ok(None)
    }

    /// Everything after `switch`:
    /// `"{" eol {"case" expression eol {command}} "}" eol`
    fn switch_body(&mut self) -> Result<Statement> {
        self.expect_symbol("{", "No '{' following 'switch'")?;
        self.expect_eol("No eol following '{'")?;

        let mut cases = Vec::new();
        while self.keyword("case") {
            let guard = self.expect_expression("Invalid expression following 'case'")?;
            self.expect_eol("No valid eol following expression")?;
            let mut body = Vec::new();
            while let Some(command) = self.is_command()? {
                body.push(command);
            }
            cases.push(Case { guard, body });
        }

        self.expect_symbol("}", "Error with closing '}'")?;
        self.expect_eol("Error with final eol")?;

        Ok(Statement::Switch(cases))
    }

    /// `expression ::= arithmetic_expression {comparator arithmetic_expression}`
    pub fn is_expression(&mut self) -> Result<Option<Expression>> {
        let Some(mut left) = self.is_arithmetic_expression()? else {
            return Ok(None);
        };
        while let Some(op) = self.is_comparator()? {
            let right = self
                .is_arithmetic_expression()?
                .ok_or_else(|| self.error("Illegal expression after comparator"))?;
            left = Expression::binary(op, left, right);
        }
        Ok(Some(left))
    }

    /// `arithmetic_expression ::= term {add_operator term}`
    pub fn is_arithmetic_expression(&mut self) -> Result<Option<Expression>> {
        let Some(mut left) = self.is_term()? else {
            return Ok(None);
        };
        while let Some(op) = self.is_add_operator() {
            let right = self
                .is_term()?
                .ok_or_else(|| self.error("Error in expression after '+' or '-'"))?;
            left = Expression::binary(op, left, right);
        }
        Ok(Some(left))
    }

    /// `term ::= factor {multiply_operator factor}`
    pub fn is_term(&mut self) -> Result<Option<Expression>> {
        let Some(mut left) = self.is_factor()? else {
            return Ok(None);
        };
        while let Some(op) = self.is_multiply_operator() {
            let right = self
                .is_factor()?
                .ok_or_else(|| self.error("No term after '*' or '/'"))?;
            left = Expression::binary(op, left, right);
        }
        Ok(Some(left))
    }

    /// `factor ::= ["+" | "-"] unsigned_factor`
    pub fn is_factor(&mut self) -> Result<Option<Expression>> {
        let op = if self.symbol("+") {
            Some(UnaryOperator::Plus)
        } else if self.symbol("-") {
            Some(UnaryOperator::Minus)
        } else {
            None
        };

        match (op, self.is_unsigned_factor()?) {
            (Some(op), Some(operand)) => Ok(Some(Expression::unary(op, operand))),
            (Some(_), None) => Err(self.error("No factor following unary plus or minus")),
            (None, factor) => Ok(factor),
        }
    }

    /// ```text
    /// unsigned_factor ::= NAME "." NAME | NAME parameter_list | NAME | NUMBER
    ///                   | "(" expression ")"
    /// ```
    fn is_unsigned_factor(&mut self) -> Result<Option<Expression>> {
        if let Some(name) = self.name() {
            if self.symbol(".") {
                let field = self
                    .name()
                    .ok_or_else(|| self.error("Incorrect use of dot notation"))?;
                return Ok(Some(Expression::Dot { owner: name, field }));
            }
            if let Some(args) = self.is_parameter_list()? {
                return Ok(Some(Expression::Call(Call { name, args })));
            }
            return Ok(Some(Expression::Variable(name)));
        }

        if let Some(token) = self.next_token_matches(TokenKind::Number) {
            let value = token
                .text
                .parse()
                .map_err(|_| self.error(format!("Malformed number '{}'", token.text)))?;
            return Ok(Some(Expression::Number(value)));
        }

        if self.symbol("(") {
            let inner = self
                .is_expression()?
                .ok_or_else(|| self.error("Error in parenthesized expression"))?;
            if !self.symbol(")") {
                return Err(self.error("Unclosed parenthetical expression"));
            }
            return Ok(Some(inner));
        }

        Ok(None)
    }

    /// `parameter_list ::= "(" [expression {"," expression}] ")"`
    pub fn is_parameter_list(&mut self) -> Result<Option<Vec<Expression>>> {
        if !self.symbol("(") {
            return Ok(None);
        }
        let mut args = Vec::new();
        if let Some(first) = self.is_expression()? {
            args.push(first);
            while self.symbol(",") {
                args.push(self.expect_expression("No expression after ','")?);
            }
        }
        if !self.symbol(")") {
            return Err(self.error("Parameter list doesn't end with ')'"));
        }
        Ok(Some(args))
    }

    /// `function_call ::= NAME parameter_list`
    pub fn is_function_call(&mut self) -> Result<Option<Call>> {
        let Some(name) = self.name() else {
            return Ok(None);
        };
        let args = self
            .is_parameter_list()?
            .ok_or_else(|| self.error("No parameter list following the name token"))?;
        Ok(Some(Call { name, args }))
    }

    /// `comparator ::= "<" | "<=" | "=" | "!=" | ">=" | ">"`
    fn is_comparator(&mut self) -> Result<Option<BinaryOperator>> {
        if self.symbol("=") {
            return Ok(Some(BinaryOperator::Equal));
        }
        if self.symbol("!") {
            if self.symbol("=") {
                return Ok(Some(BinaryOperator::NotEqual));
            }
            return Err(self.error("! not followed by ="));
        }
        if self.symbol("<") {
            if self.symbol("=") {
                return Ok(Some(BinaryOperator::LessOrEqual));
            }
            return Ok(Some(BinaryOperator::Less));
        }
        if self.symbol(">") {
            if self.symbol("=") {
                return Ok(Some(BinaryOperator::GreaterOrEqual));
            }
            return Ok(Some(BinaryOperator::Greater));
        }
        Ok(None)
    }

    fn is_add_operator(&mut self) -> Option<BinaryOperator> {
        if self.symbol("+") {
            Some(BinaryOperator::Add)
        } else if self.symbol("-") {
            Some(BinaryOperator::Subtract)
        } else {
            None
        }
    }

    fn is_multiply_operator(&mut self) -> Option<BinaryOperator> {
        if self.symbol("*") {
            Some(BinaryOperator::Multiply)
        } else if self.symbol("/") {
            Some(BinaryOperator::Divide)
        } else {
            None
        }
    }

    /// `eol ::= EOL {EOL}`
    pub fn is_eol(&mut self) -> bool {
        if self.next_token_matches(TokenKind::Eol).is_none() {
            return false;
        }
        while self.next_token_matches(TokenKind::Eol).is_some() {}
        true
    }

    /// Skip blank lines, then require end of input.
    pub fn expect_end(&mut self, what: &str) -> Result<()> {
        while self.next_token_matches(TokenKind::Eol).is_some() {}
        let token = self.lexer.next_token();
        if token.kind == TokenKind::Eof {
            Ok(())
        } else {
            Err(self.error(format!("Unexpected '{}' after {}", token.text, what)))
        }
    }

    // helpers

    fn expect_expression(&mut self, message: &str) -> Result<Expression> {
        self.is_expression()?.ok_or_else(|| self.error(message))
    }

    fn expect_symbol(&mut self, symbol: &str, message: &str) -> Result<()> {
        if self.symbol(symbol) {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_eol(&mut self, message: &str) -> Result<()> {
        if self.is_eol() {
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn name(&mut self) -> Option<String> {
        self.next_token_matches(TokenKind::Name).map(|t| t.text)
    }

    fn keyword(&mut self, expected: &str) -> bool {
        self.next_token_is(TokenKind::Keyword, expected)
    }

    fn symbol(&mut self, expected: &str) -> bool {
        self.next_token_is(TokenKind::Symbol, expected)
    }

    /// Consume the next token if it has the given kind.
    fn next_token_matches(&mut self, kind: TokenKind) -> Option<Token> {
        let token = self.lexer.next_token();
        if token.kind == kind {
            Some(token)
        } else {
            self.lexer.push_back();
            None
        }
    }

    fn next_token_is(&mut self, kind: TokenKind, text: &str) -> bool {
        let token = self.lexer.next_token();
        if token.is(kind, text) {
            true
        } else {
            self.lexer.push_back();
            false
        }
    }

    fn error(&self, message: impl Into<String>) -> BugsError {
        BugsError::syntax(self.lexer.line(), message)
    }
}

/// Parse a complete program.
pub fn parse_program(source: &str) -> Result<Program> {
    Parser::new(source).parse()
}

/// Check that `source` is a valid program without keeping the tree.
pub fn recognize(source: &str) -> Result<()> {
    parse_program(source).map(|_| ())
}

fn parse_fragment<T>(
    source: &str,
    what: &str,
    production: impl FnOnce(&mut Parser) -> Result<Option<T>>,
) -> Result<T> {
    let mut parser = Parser::new(source);
    let parsed = production(&mut parser)?
        .ok_or_else(|| BugsError::syntax(parser.lexer.line(), format!("Input is not a valid {}", what)))?;
    parser.expect_end(what)?;
    Ok(parsed)
}

/// Parse a single expression such as `x + 1 > 3`.
pub fn parse_expression(source: &str) -> Result<Expression> {
    parse_fragment(source, "expression", Parser::is_expression)
}

/// Parse a single command (action or statement), including its trailing eol.
pub fn parse_command(source: &str) -> Result<Statement> {
    parse_fragment(source, "command", Parser::is_command)
}

pub fn parse_block(source: &str) -> Result<Block> {
    parse_fragment(source, "block", Parser::is_block)
}

pub fn parse_initialization_block(source: &str) -> Result<Block> {
    parse_fragment(source, "initialization block", Parser::is_initialization_block)
}

pub fn parse_var_declaration(source: &str) -> Result<VarDeclaration> {
    parse_fragment(source, "var declaration", Parser::is_var_declaration)
}

pub fn parse_function_definition(source: &str) -> Result<Arc<FunctionDefinition>> {
    parse_fragment(source, "function definition", Parser::is_function_definition)
}

pub fn parse_function_call(source: &str) -> Result<Call> {
    parse_fragment(source, "function call", Parser::is_function_call)
}

pub fn parse_bug_definition(source: &str) -> Result<BugDefinition> {
    parse_fragment(source, "bug definition", Parser::is_bug_definition)
}

pub fn parse_allbugs(source: &str) -> Result<Allbugs> {
    parse_fragment(source, "allbugs section", Parser::is_allbugs_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(value: f64) -> Expression {
        Expression::Number(value)
    }

    fn var(name: &str) -> Expression {
        Expression::Variable(name.to_string())
    }

    fn syntax_line(result: Result<impl std::fmt::Debug>) -> usize {
        match result {
            Err(BugsError::Syntax { line, .. }) => line,
            other => panic!("expected syntax error, got {:?}", other),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse_expression("2 + 3 * 4").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOperator::Add,
                num(2.0),
                Expression::binary(BinaryOperator::Multiply, num(3.0), num(4.0))
            )
        );
    }

    #[test]
    fn test_left_associativity() {
        let expr = parse_expression("a - b - c").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOperator::Subtract,
                Expression::binary(BinaryOperator::Subtract, var("a"), var("b")),
                var("c")
            )
        );

        let expr = parse_expression("1 < 2 = 1").unwrap();
        assert_eq!(
            expr,
            Expression::binary(
                BinaryOperator::Equal,
                Expression::binary(BinaryOperator::Less, num(1.0), num(2.0)),
                num(1.0)
            )
        );
    }

    #[test]
    fn test_compound_comparators() {
        for (source, op) in [
            ("x != y", BinaryOperator::NotEqual),
            ("x <= y", BinaryOperator::LessOrEqual),
            ("x >= y", BinaryOperator::GreaterOrEqual),
            ("x < y", BinaryOperator::Less),
            ("x > y", BinaryOperator::Greater),
        ] {
            assert_eq!(
                parse_expression(source).unwrap(),
                Expression::binary(op, var("x"), var("y")),
                "{}",
                source
            );
        }
    }

    #[test]
    fn test_bang_requires_equals() {
        let err = parse_expression("x ! y").unwrap_err();
        assert!(err.to_string().contains("! not followed by ="));
    }

    #[test]
    fn test_unary_and_parentheses() {
        assert_eq!(
            parse_expression("-(3)").unwrap(),
            Expression::unary(UnaryOperator::Minus, num(3.0))
        );
        assert_eq!(
            parse_expression("2 * -x").unwrap(),
            Expression::binary(
                BinaryOperator::Multiply,
                num(2.0),
                Expression::unary(UnaryOperator::Minus, var("x"))
            )
        );
        assert!(parse_expression("- - 3").is_err());
        assert!(parse_expression("(1 + 2").is_err());
    }

    #[test]
    fn test_dot_and_call() {
        assert_eq!(
            parse_expression("Sally.x").unwrap(),
            Expression::Dot {
                owner: "Sally".to_string(),
                field: "x".to_string()
            }
        );
        assert_eq!(
            parse_expression("f(1, y)").unwrap(),
            Expression::Call(Call {
                name: "f".to_string(),
                args: vec![num(1.0), var("y")]
            })
        );
        assert_eq!(parse_function_call("g()").unwrap().args.len(), 0);
        assert!(parse_expression("Sally.").is_err());
        assert!(parse_function_call("g").is_err());
    }

    #[test]
    fn test_actions() {
        assert_eq!(parse_command("move 5\n").unwrap(), Statement::Move(num(5.0)));
        assert_eq!(
            parse_command("moveto 1, 2\n").unwrap(),
            Statement::MoveTo {
                x: num(1.0),
                y: num(2.0)
            }
        );
        let line = parse_command("line 0, 0, x, y\n").unwrap();
        assert_eq!(line.tag(), "line");
        assert!(parse_command("line 0, 0, x\n").is_err());
        assert!(parse_command("move 5").is_err());
    }

    #[test]
    fn test_statements() {
        assert_eq!(
            parse_command("x = x + 1\n").unwrap(),
            Statement::Assign {
                name: "x".to_string(),
                value: Expression::binary(BinaryOperator::Add, var("x"), num(1.0))
            }
        );
        assert_eq!(
            parse_command("do f\n").unwrap(),
            Statement::Do(Call {
                name: "f".to_string(),
                args: vec![]
            })
        );
        assert_eq!(
            parse_command("color red\n").unwrap(),
            Statement::Color("red".to_string())
        );
        assert_eq!(parse_command("exit if x > 3\n").unwrap().tag(), "exit");
        assert_eq!(parse_command("return 0\n").unwrap().tag(), "return");
        assert!(parse_command("color purplish\n").is_err());
        assert!(parse_command("exit x\n").is_err());
        assert!(parse_command("x 5\n").is_err());
    }

    #[test]
    fn test_loop_and_switch() {
        let looped = parse_command("loop {\nmove 1\nexit if x > 3\n}\n").unwrap();
        match looped {
            Statement::Loop(block) => assert_eq!(block.statements.len(), 2),
            other => panic!("expected loop, got {:?}", other),
        }

        let switch = parse_command("switch {\ncase x = 0\nx = 1\ny = 2\ncase 1\n}\n").unwrap();
        match switch {
            Statement::Switch(cases) => {
                assert_eq!(cases.len(), 2);
                assert_eq!(cases[0].body.len(), 2);
                assert!(cases[1].body.is_empty());
            }
            other => panic!("expected switch, got {:?}", other),
        }

        assert_eq!(parse_command("switch {\n}\n").unwrap(), Statement::Switch(vec![]));
    }

    #[test]
    fn test_non_command_is_not_matched() {
        let mut parser = Parser::new("}\n");
        assert!(parser.is_command().unwrap().is_none());
        // the token is still available afterwards
        assert!(parser.is_block().unwrap().is_none());
        assert!(parser.symbol("}"));
    }

    #[test]
    fn test_var_and_function_definitions() {
        assert_eq!(
            parse_var_declaration("var a, b, c\n").unwrap().names,
            vec!["a", "b", "c"]
        );
        assert!(parse_var_declaration("var a,\n").is_err());

        let function = parse_function_definition("define f using a, b {\nreturn a + b\n}\n").unwrap();
        assert_eq!(function.name, "f");
        assert_eq!(function.parameters, vec!["a", "b"]);
        assert_eq!(function.body.statements.len(), 1);

        let function = parse_function_definition("define g {\n}\n").unwrap();
        assert!(function.parameters.is_empty());
    }

    #[test]
    fn test_bug_definition() {
        let bug = parse_bug_definition(
            "Bug Sally {\nvar a\nvar b, c\ninitially {\nx = 3\n}\nmove a\nturn 90\ndefine f {\n}\n}\n",
        )
        .unwrap();
        assert_eq!(bug.name, "Sally");
        assert_eq!(bug.variables.len(), 2);
        assert_eq!(bug.initially.statements.len(), 1);
        assert_eq!(bug.body.statements.len(), 2);
        assert_eq!(bug.functions.len(), 1);

        let bare = parse_bug_definition("Bug Fred {\nmove 1\n}\n").unwrap();
        assert!(bare.initially.is_empty());
        assert!(bare.variables.is_empty());

        let err = parse_bug_definition("Bug Fred {\n}\n").unwrap_err();
        assert!(err.to_string().contains("first command"));
    }

    #[test]
    fn test_program() {
        let source = "Allbugs {\nvar g\ndefine f {\n}\n}\n\nBug A {\nmove 1\n}\nBug B {\nturn 1\n}\n";
        let program = parse_program(source).unwrap();
        assert_eq!(program.allbugs.variables.len(), 1);
        assert_eq!(program.allbugs.functions.len(), 1);
        assert_eq!(program.bugs.len(), 2);

        let program = parse_program("Bug A {\nmove 1\n}\n").unwrap();
        assert_eq!(program.allbugs, Allbugs::default());
    }

    #[test]
    fn test_program_requires_a_bug() {
        assert!(parse_program("").is_err());
        assert!(parse_program("Allbugs {\n}\n").is_err());
        assert!(parse_program("Bug A {\nmove 1\n}\nmove 2\n").is_err());
    }

    #[test]
    fn test_syntax_error_line() {
        assert_eq!(syntax_line(parse_program("Bug A {\nmove 1\nmove\n}\n")), 3);
        assert_eq!(syntax_line(parse_program("Bug A {\nmove 1\n\n\nturn 2 3\n}\n")), 5);
    }

    #[test]
    fn test_reparse_is_structurally_identical() {
        let source = "Bug A {\nvar n\nloop {\nn = n + 1\nexit if n >= 3\n}\n}\n";
        assert_eq!(parse_program(source).unwrap(), parse_program(source).unwrap());
        assert!(recognize(source).is_ok());
    }
}
