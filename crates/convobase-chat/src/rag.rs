use convobase_files::FileContext;

pub const RAG_INSTRUCTION: &str = "ファイルの内容を参考にして質問に答えてください。";
pub const FILE_BLOCK_START: &str = "--- ファイル内容 ---";
pub const FILE_BLOCK_END: &str = "--- ファイル終了 ---";

/// Appends the referenced files to the caller's system prompt between fixed
/// delimiters. The delimiters are part of the contract and stay verbatim
/// even if truncation is added later.
pub fn compose_system_prompt(base: Option<&str>, contexts: &[FileContext]) -> Option<String> {
    let base = base.filter(|s| !s.is_empty());
    if contexts.is_empty() {
        return base.map(str::to_string);
    }

    let mut prompt = String::new();
    if let Some(base) = base {
        prompt.push_str(base);
        prompt.push_str("\n\n");
    }
    prompt.push_str(RAG_INSTRUCTION);
    for context in contexts {
        prompt.push('\n');
        prompt.push_str(FILE_BLOCK_START);
        prompt.push('\n');
        prompt.push_str(&context.file_name);
        prompt.push('\n');
        prompt.push_str(&context.text);
        prompt.push('\n');
        prompt.push_str(FILE_BLOCK_END);
    }
    Some(prompt)
}
