//! Human-readable rendering of instructions for logs and error reports.

use std::fmt::Write;

use mango_interface::{MangoInstruction, TOKEN_PROGRAM_ID, TokenInstruction};
use solana_instruction::Instruction;
use solana_pubkey::Pubkey;

/// One-line-per-account description of an instruction.
///
/// Instructions addressed to `program_id` or the token program are named and
/// their arguments decoded; anything else is shown as program, accounts and
/// hex data.
pub fn describe_instruction(instruction: &Instruction, program_id: &Pubkey) -> String {
    let mut out = String::new();
    let decoded = (instruction.program_id == *program_id)
        .then(|| MangoInstruction::unpack(&instruction.data))
        .flatten();
    match decoded {
        Some(MangoInstruction::Deposit(args)) => {
            let _ = write!(out, "Mango Deposit (quantity: {})", args.quantity);
        }
        Some(MangoInstruction::Withdraw(args)) => {
            let _ = write!(
                out,
                "Mango Withdraw (quantity: {}, allow_borrow: {})",
                args.quantity, args.allow_borrow
            );
        }
        Some(MangoInstruction::PlaceSpotOrder(args)) => {
            let side = args
                .side()
                .map_or_else(|| args.side.to_string(), |side| side.to_string());
            let _ = write!(
                out,
                "Mango PlaceSpotOrder (side: {side}, limit_price: {}, max_coin_qty: {}, client_order_id: {})",
                args.limit_price, args.max_coin_qty, args.client_order_id
            );
        }
        Some(other) => {
            let _ = write!(out, "Mango {}", other.kind());
        }
        None => describe_foreign(&mut out, instruction),
    }
    for (index, meta) in instruction.accounts.iter().enumerate() {
        let flags = match (meta.is_signer, meta.is_writable) {
            (true, true) => " (signer, writable)",
            (true, false) => " (signer)",
            (false, true) => " (writable)",
            (false, false) => "",
        };
        let _ = write!(out, "\n  {index}: {}{flags}", meta.pubkey);
    }
    out
}

/// Describe a run of instructions, numbering them from `first_index`.
pub fn describe_instructions(
    instructions: &[Instruction],
    first_index: usize,
    program_id: &Pubkey,
) -> String {
    instructions
        .iter()
        .enumerate()
        .map(|(offset, instruction)| {
            format!(
                "[{}] {}",
                first_index + offset,
                describe_instruction(instruction, program_id)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn describe_foreign(out: &mut String, instruction: &Instruction) {
    let token = (instruction.program_id.to_bytes() == TOKEN_PROGRAM_ID)
        .then(|| TokenInstruction::unpack(&instruction.data))
        .flatten();
    let _ = match token {
        Some(TokenInstruction::InitializeAccount3 { owner }) => {
            write!(out, "Token InitializeAccount3 (owner: {})", Pubkey::new_from_array(owner))
        }
        Some(TokenInstruction::TransferChecked { amount, decimals }) => write!(
            out,
            "Token TransferChecked (amount: {amount}, decimals: {decimals})"
        ),
        Some(TokenInstruction::CloseAccount) => write!(out, "Token CloseAccount"),
        None => write!(
            out,
            "{} instruction, data: {}",
            program_name(&instruction.program_id),
            hex::encode(&instruction.data)
        ),
    };
}

fn program_name(program_id: &Pubkey) -> String {
    if *program_id == solana_system_interface::program::ID {
        "System".to_string()
    } else if program_id.to_bytes() == TOKEN_PROGRAM_ID {
        "Token".to_string()
    } else {
        program_id.to_string()
    }
}
