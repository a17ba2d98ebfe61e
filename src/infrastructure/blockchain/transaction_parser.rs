//! Converts `jsonParsed` RPC transactions into trade candidates

use crate::domain::trade::{Instruction, InstructionKind, Placement, TokenBalance, TradeCandidate};
use serde_json::Value;
use solana_transaction_status::{
    EncodedConfirmedTransactionWithStatusMeta, EncodedTransaction, UiInstruction, UiMessage, UiParsedInstruction,
    UiTransactionTokenBalance,
};
use tracing::debug;

pub const MEMO_PROGRAM_IDS: [&str; 2] = [
    "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr",
    "Memo1UhkJRfHyvLMcVucJwxXeuD728EqVDDwQDxFMNo",
];

/// Build a candidate, or `None` if the node returned no metadata
pub fn parse_confirmed_transaction(
    signature: &str,
    tx: EncodedConfirmedTransactionWithStatusMeta,
) -> Option<TradeCandidate> {
    let EncodedConfirmedTransactionWithStatusMeta {
        slot,
        transaction,
        block_time,
    } = tx;

    let Some(meta) = transaction.meta else {
        debug!("No transaction metadata found for {}", signature);
        return None;
    };

    let EncodedTransaction::Json(ui_tx) = transaction.transaction else {
        debug!("Transaction {} was not returned as JSON", signature);
        return None;
    };

    let (account_keys, outer): (Vec<String>, Vec<UiInstruction>) = match ui_tx.message {
        UiMessage::Parsed(message) => (
            message.account_keys.into_iter().map(|key| key.pubkey).collect(),
            message.instructions,
        ),
        UiMessage::Raw(message) => (
            message.account_keys,
            message.instructions.into_iter().map(UiInstruction::Compiled).collect(),
        ),
    };

    let mut instructions: Vec<Instruction> = outer
        .iter()
        .map(|ix| convert_instruction(ix, &account_keys, Placement::Outer))
        .collect();

    let inner = Option::<Vec<_>>::from(meta.inner_instructions).unwrap_or_default();
    for group in &inner {
        instructions.extend(
            group
                .instructions
                .iter()
                .map(|ix| convert_instruction(ix, &account_keys, Placement::Inner)),
        );
    }

    Some(TradeCandidate {
        signature: signature.to_string(),
        slot,
        block_time,
        account_keys,
        pre_balances: meta.pre_balances,
        post_balances: meta.post_balances,
        pre_token_balances: convert_token_balances(Option::<Vec<_>>::from(meta.pre_token_balances)),
        post_token_balances: convert_token_balances(Option::<Vec<_>>::from(meta.post_token_balances)),
        instructions,
        err: meta.err.map(|e| format!("{:?}", e)),
    })
}

fn convert_token_balances(balances: Option<Vec<UiTransactionTokenBalance>>) -> Vec<TokenBalance> {
    balances
        .unwrap_or_default()
        .into_iter()
        .map(|b| TokenBalance {
            account_index: b.account_index,
            mint: b.mint,
            owner: Option::<String>::from(b.owner),
            amount: b.ui_token_amount.amount.parse().unwrap_or(0),
            decimals: b.ui_token_amount.decimals,
        })
        .collect()
}

fn convert_instruction(ix: &UiInstruction, account_keys: &[String], placement: Placement) -> Instruction {
    match ix {
        UiInstruction::Parsed(UiParsedInstruction::Parsed(parsed)) => Instruction::new(
            parsed.program_id.clone(),
            placement,
            decode_parsed(&parsed.program, &parsed.parsed),
        ),
        UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(decoded)) => Instruction::new(
            decoded.program_id.clone(),
            placement,
            decode_raw_memo(&decoded.program_id, &decoded.data),
        ),
        UiInstruction::Compiled(compiled) => {
            let program_id = account_keys
                .get(compiled.program_id_index as usize)
                .cloned()
                .unwrap_or_default();
            let kind = decode_raw_memo(&program_id, &compiled.data);
            Instruction::new(program_id, placement, kind)
        }
    }
}

/// Decode the `parsed` payload of a jsonParsed instruction
pub fn decode_parsed(program: &str, parsed: &Value) -> InstructionKind {
    let decoded = match program {
        "spl-memo" => parsed.as_str().map(|text| InstructionKind::Memo(text.to_string())),
        "system" => decode_system(parsed),
        "spl-token" | "spl-token-2022" => decode_token(parsed),
        _ => None,
    };
    decoded.unwrap_or(InstructionKind::Other)
}

fn str_field(info: &Value, key: &str) -> Option<String> {
    info.get(key).and_then(Value::as_str).map(str::to_string)
}

fn decode_system(parsed: &Value) -> Option<InstructionKind> {
    let info = parsed.get("info")?;
    match parsed.get("type").and_then(Value::as_str)? {
        "transfer" | "transferWithSeed" => Some(InstructionKind::SolTransfer {
            source: str_field(info, "source")?,
            destination: str_field(info, "destination")?,
            lamports: info.get("lamports").and_then(Value::as_u64)?,
        }),
        _ => None,
    }
}

fn decode_token(parsed: &Value) -> Option<InstructionKind> {
    let info = parsed.get("info")?;
    let amount = match parsed.get("type").and_then(Value::as_str)? {
        "transfer" => info.get("amount").and_then(Value::as_str)?,
        "transferChecked" => info.get("tokenAmount")?.get("amount").and_then(Value::as_str)?,
        _ => return None,
    };

    Some(InstructionKind::TokenTransfer {
        source: str_field(info, "source")?,
        destination: str_field(info, "destination")?,
        authority: str_field(info, "authority"),
        mint: str_field(info, "mint"),
        amount: amount.parse().ok()?,
    })
}

fn decode_raw_memo(program_id: &str, data: &str) -> InstructionKind {
    if !MEMO_PROGRAM_IDS.contains(&program_id) {
        return InstructionKind::Other;
    }
    bs58::decode(data)
        .into_vec()
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
        .map(InstructionKind::Memo)
        .unwrap_or(InstructionKind::Other)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_system_transfer() {
        let parsed = json!({
            "type": "transfer",
            "info": {
                "source": "wallet",
                "destination": "tip",
                "lamports": 10000
            }
        });

        assert_eq!(
            decode_parsed("system", &parsed),
            InstructionKind::SolTransfer {
                source: "wallet".to_string(),
                destination: "tip".to_string(),
                lamports: 10_000,
            }
        );
    }

    #[test]
    fn test_decode_transfer_checked() {
        let parsed = json!({
            "type": "transferChecked",
            "info": {
                "source": "ata-a",
                "destination": "ata-b",
                "authority": "wallet",
                "mint": "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
                "tokenAmount": { "amount": "5000000", "decimals": 6, "uiAmount": 5.0 }
            }
        });

        match decode_parsed("spl-token", &parsed) {
            InstructionKind::TokenTransfer { amount, mint, authority, .. } => {
                assert_eq!(amount, 5_000_000);
                assert_eq!(mint.as_deref(), Some("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"));
                assert_eq!(authority.as_deref(), Some("wallet"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_decode_memo() {
        assert_eq!(
            decode_parsed("spl-memo", &json!("hello")),
            InstructionKind::Memo("hello".to_string())
        );
        let encoded = bs58::encode("raw memo").into_string();
        assert_eq!(
            decode_raw_memo(MEMO_PROGRAM_IDS[0], &encoded),
            InstructionKind::Memo("raw memo".to_string())
        );
    }

    #[test]
    fn test_unknown_shapes_are_other() {
        assert_eq!(decode_parsed("system", &json!({ "type": "createAccount", "info": {} })), InstructionKind::Other);
        assert_eq!(decode_parsed("spl-token", &json!({ "type": "transfer" })), InstructionKind::Other);
        assert_eq!(decode_parsed("vote", &json!({})), InstructionKind::Other);
        assert_eq!(decode_raw_memo("whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc", "abc"), InstructionKind::Other);
    }
}
