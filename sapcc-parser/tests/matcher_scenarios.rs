//! End-to-end matcher tests: grammar text is compiled, encoded, and the table is run against
//! token streams.

use rstest::rstest;
use sapcc_parser::sapcc::matching::{AstNode, MatchError, Matcher};
use sapcc_parser::sapcc::testing::factories::{compile_valid, mk_stream};
use sapcc_parser::sapcc::trace::trace_stream;
use sapcc_parser::sapcc::{encode, EncodedTable, Grammar, TokenKind};

const SUM: &str = "%tokens PLUS NUM %end Sum : NUM PLUS NUM {} : NUM {}";
const PLUS: u16 = 500;
const NUM: u16 = 501;
const SUM_ID: u16 = 1000;

fn build(source: &str) -> (Grammar, EncodedTable) {
    let grammar = compile_valid(source).grammar;
    let table = encode(&grammar).expect("valid grammar encodes");
    (grammar, table)
}

#[test]
fn test_sum_takes_first_alternative() {
    let (_, table) = build(SUM);
    let matcher = Matcher::new(&table);
    let mut stream = mk_stream(&[NUM, PLUS, NUM]);

    let ast = matcher.match_rule(&mut stream, SUM_ID, true).unwrap().unwrap();
    assert_eq!(ast.kind, SUM_ID);
    assert_eq!(ast.alternative, 0);
    assert_eq!(ast.children.len(), 3);
    assert!(stream.current().kind.is_end());
}

#[test]
fn test_sum_falls_back_to_second_alternative() {
    let (_, table) = build(SUM);
    let matcher = Matcher::new(&table);
    let mut stream = mk_stream(&[NUM]);

    let ast = matcher.match_rule(&mut stream, SUM_ID, true).unwrap().unwrap();
    assert_eq!(ast.alternative, 1);
    assert_eq!(ast.children.len(), 1);
    assert!(stream.current().kind.is_end());
}

#[test]
fn test_sum_rejects_leading_plus() {
    let (grammar, table) = build(SUM);
    let matcher = Matcher::new(&table).with_grammar(&grammar);
    let mut stream = mk_stream(&[PLUS]);

    let err = matcher.match_rule(&mut stream, SUM_ID, true).unwrap_err();
    match err {
        MatchError::Syntax {
            location, expected, ..
        } => {
            assert_eq!(location.to_string(), "test:1:1");
            assert_eq!(expected, vec!["NUM"]);
        }
        other => panic!("expected a syntax error, got {other}"),
    }
}

#[test]
fn test_backtracking_does_not_lose_tokens() {
    let (_, table) = build("%tokens a b c %end X : a b {} : a c {}");
    let matcher = Matcher::new(&table);
    let mut stream = mk_stream(&[500, 502]);

    let ast = matcher.parse(&mut stream).unwrap();
    assert_eq!(ast.alternative, 1);
    let kinds: Vec<u16> = ast.tokens().iter().map(|t| t.kind).collect();
    assert_eq!(kinds, vec![500, 502]);
}

#[test]
fn test_ordered_choice_prefers_first_alternative() {
    // both alternatives match `a b`, the first is shaped by the nested rule
    let source = "%tokens a b %end X : Pair {} : a b {} Pair : a b {}";
    let (_, table) = build(source);
    let matcher = Matcher::new(&table);
    let mut stream = mk_stream(&[500, 501]);

    let ast = matcher.parse(&mut stream).unwrap();
    assert_eq!(ast.alternative, 0);
    assert!(matches!(&ast.children[..], [AstNode::Rule(pair)] if pair.kind == 1001));
}

#[test]
fn test_prefix_alternative_shadows_longer_one() {
    let (_, table) = build("%tokens a b %end X : a {} : a b {}");
    let matcher = Matcher::new(&table);
    let mut stream = mk_stream(&[500, 501]);

    let ast = matcher.parse(&mut stream).unwrap();
    assert_eq!(ast.alternative, 0);
    assert_eq!(stream.current().kind, 501);
    assert!(matcher.parse_complete(&mut mk_stream(&[500, 501])).is_err());
}

#[test]
fn test_nested_rules_rewind_past_committed_matches() {
    // Item commits `a` before Seq fails on the missing `c` and falls back
    let source = "%tokens a b c %end Seq : Item c {} : Item b {} Item : a {}";
    let (_, table) = build(source);
    let matcher = Matcher::new(&table);
    let mut stream = mk_stream(&[500, 501]);

    let ast = matcher.parse_complete(&mut stream).unwrap();
    assert_eq!(ast.alternative, 1);
    assert_eq!(ast.tokens().len(), 2);
}

#[test]
fn test_right_recursive_list() {
    let source = "%tokens ID COMMA %end List : ID COMMA List {} : ID {}";
    let (grammar, table) = build(source);
    let matcher = Matcher::new(&table).with_grammar(&grammar);
    let mut stream = trace_stream("list.trace", "ID COMMA ID COMMA ID", &grammar).unwrap();

    let ast = matcher.parse_complete(&mut stream).unwrap();
    assert_eq!(ast.tokens().len(), 5);
    insta::assert_snapshot!(matcher.render(&ast), @r###"
    List #0
      ID
      COMMA
      List #0
        ID
        COMMA
        List #1
          ID
    "###);
}

#[test]
fn test_kept_terminals_retain_text() {
    let source = "%tokens NUM@ PLUS %end Sum : NUM PLUS NUM {} : NUM {}";
    let (grammar, table) = build(source);
    let matcher = Matcher::new(&table).with_grammar(&grammar);
    let mut stream = trace_stream("sum.trace", "NUM=1 PLUS=+ NUM=2", &grammar).unwrap();

    let ast = matcher.parse_complete(&mut stream).unwrap();
    let texts: Vec<&str> = ast.tokens().iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["1", "", "2"]);
}

#[rstest]
#[case("NUM", true)]
#[case("NUM PLUS NUM", true)]
#[case("NUM PLUS NUM PLUS NUM", true)]
#[case("LPAREN NUM RPAREN", true)]
#[case("LPAREN NUM PLUS NUM RPAREN PLUS NUM", true)]
#[case("", false)]
#[case("PLUS NUM", false)]
#[case("NUM PLUS", false)]
#[case("LPAREN NUM", false)]
#[case("NUM NUM", false)]
fn test_expression_grammar(#[case] trace: &str, #[case] accepted: bool) {
    let source = r#"
        %tokens NUM@ PLUS LPAREN RPAREN %end
        %grammar
            expr {} : term PLUS expr {} : term {} ; {}
            term {} : NUM {} : LPAREN expr RPAREN {} ; {}
        %end
    "#;
    let (grammar, table) = build(source);
    let matcher = Matcher::new(&table).with_grammar(&grammar);
    let mut stream = trace_stream("expr.trace", trace, &grammar).unwrap();

    assert_eq!(matcher.parse_complete(&mut stream).is_ok(), accepted, "trace: {trace}");
}
