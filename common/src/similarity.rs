//! 文字列類似度
//!
//! - 編集距離（Levenshtein、文字単位）
//! - ゲシュタルト類似度（Ratcliff/Obershelp、0.0〜1.0）
//! - CJK名のローマ字化（ピンイン）

use pinyin::ToPinyin;

/// 編集距離（文字単位）
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// ゲシュタルト類似度 `2 * M / (|a| + |b|)`
///
/// Mは最長一致ブロックを再帰的に取り出した一致文字数の合計。
/// 両方空なら1.0。
pub fn sequence_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    2.0 * matching_chars(&a, &b) as f64 / total as f64
}

fn matching_chars(a: &[char], b: &[char]) -> usize {
    let (i, j, size) = longest_common_block(a, b);
    if size == 0 {
        return 0;
    }

    size + matching_chars(&a[..i], &b[..j])
        + matching_chars(&a[i + size..], &b[j + size..])
}

/// 最長の共通部分文字列 (aの開始位置, bの開始位置, 長さ)
///
/// 同じ長さなら a 側、次に b 側で先に現れるものを返す。
fn longest_common_block(a: &[char], b: &[char]) -> (usize, usize, usize) {
    let mut best = (0, 0, 0);
    // prev[j + 1] = a[i-1] と b[j] で終わる一致長
    let mut prev = vec![0usize; b.len() + 1];

    for i in 0..a.len() {
        let mut current = vec![0usize; b.len() + 1];
        for j in 0..b.len() {
            if a[i] == b[j] {
                let len = prev[j] + 1;
                current[j + 1] = len;
                if len > best.2 {
                    best = (i + 1 - len, j + 1 - len, len);
                }
            }
        }
        prev = current;
    }

    best
}

/// ピンインによるローマ字化
///
/// 漢字は1文字1音節、漢字以外の連続部分はそのまま1トークンとして
/// 空白区切りで連結する。`奶茶MilkTea` → `nai cha MilkTea`
pub fn romanize(text: &str) -> String {
    let mut tokens: Vec<String> = Vec::new();
    let mut literal = String::new();

    for c in text.chars() {
        if let Some(py) = c.to_pinyin() {
            if !literal.is_empty() {
                tokens.push(std::mem::take(&mut literal));
            }
            tokens.push(py.plain().to_string());
        } else if c.is_whitespace() {
            if !literal.is_empty() {
                tokens.push(std::mem::take(&mut literal));
            }
        } else {
            literal.push(c);
        }
    }
    if !literal.is_empty() {
        tokens.push(literal);
    }

    tokens.join(" ")
}
