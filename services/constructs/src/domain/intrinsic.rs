// CloudFormation組み込み関数
//
// テンプレート内でリソース間の参照を表現するためのヘルパー群。
// 値はすべてserde_json::Valueとして組み立てる。

use serde_json::{json, Value};

/// `{"Ref": logical_id}` を生成
pub fn ref_to(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

/// `{"Fn::GetAtt": [logical_id, attribute]}` を生成
pub fn get_att(logical_id: &str, attribute: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, attribute] })
}

/// `{"Fn::Sub": template}` を生成
///
/// テンプレート文字列中の `${LogicalId}` / `${LogicalId.Attr}` / `${AWS::Region}` が置換対象。
pub fn sub(template: impl Into<String>) -> Value {
    json!({ "Fn::Sub": template.into() })
}

/// Fn::Sub に埋め込むリテラル文字列をエスケープする
///
/// `${` は `${!` に置き換えることで置換対象から外れる。
pub fn escape_sub(literal: &str) -> String {
    literal.replace("${", "${!")
}

/// Value中に含まれるリソース参照（論理ID）を収集する
///
/// 対象:
/// - `Ref`
/// - `Fn::GetAtt`（配列形式・ドット区切り文字列形式）
/// - `Fn::Sub`（`${Name}` / `${Name.Attr}`、変数マップで定義された名前は除外）
///
/// `AWS::` で始まる疑似パラメータは参照として扱わない。
pub fn collect_references(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    push_reference(target, out);
                    return;
                }
                if let Some(target) = map.get("Fn::GetAtt") {
                    match target {
                        Value::Array(parts) => {
                            if let Some(Value::String(id)) = parts.first() {
                                push_reference(id, out);
                            }
                        }
                        Value::String(dotted) => {
                            let id = dotted.split('.').next().unwrap_or_default();
                            push_reference(id, out);
                        }
                        _ => {}
                    }
                    return;
                }
                if let Some(template) = map.get("Fn::Sub") {
                    collect_sub_references(template, out);
                    return;
                }
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

fn collect_sub_references(template: &Value, out: &mut Vec<String>) {
    let (text, variables) = match template {
        Value::String(text) => (text.as_str(), None),
        Value::Array(parts) => match (parts.first(), parts.get(1)) {
            (Some(Value::String(text)), variables) => {
                (text.as_str(), variables.and_then(Value::as_object))
            }
            _ => return,
        },
        _ => return,
    };

    if let Some(variables) = variables {
        for nested in variables.values() {
            collect_references(nested, out);
        }
    }

    let mut rest = text;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        let name = &after[..end];
        rest = &after[end + 1..];

        // ${!Literal} はエスケープされたリテラル
        if name.starts_with('!') {
            continue;
        }
        let id = name.split('.').next().unwrap_or_default();
        if variables.is_some_and(|vars| vars.contains_key(id)) {
            continue;
        }
        push_reference(id, out);
    }
}

fn push_reference(target: &str, out: &mut Vec<String>) {
    if target.is_empty() || target.starts_with("AWS::") {
        return;
    }
    if !out.iter().any(|existing| existing == target) {
        out.push(target.to_string());
    }
}
