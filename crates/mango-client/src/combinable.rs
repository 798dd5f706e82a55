//! Combinable instructions and atomic submission.
//!
//! A [`CombinableInstructions`] unit is an ordered instruction list plus the
//! signers those instructions need. Units combine with `+`: instructions
//! concatenate in order and signers union by address, first occurrence
//! kept. The empty unit is the identity.
//!
//! [`CombinableInstructions::execute`] submits a unit as few transactions as
//! the ledger's size limit allows. Each transaction is atomic on its own;
//! no instruction is ever submitted by itself unless it fills a transaction
//! alone. The first signer pays fees.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Range};

use log::{debug, error, info};
use mango_interface::{MANGO_PROGRAM_ID, MangoErrorCode};
use solana_hash::Hash;
use solana_instruction::Instruction;
use solana_message::Message;
use solana_pubkey::Pubkey;
use solana_signature::Signature;
use solana_signer::Signer;
use solana_transaction::Transaction;

use crate::{
    ClientError, Context, LedgerError, Result, SharedSigner, SubmissionError, Wallet,
    describe_instructions,
};

/// Bytes per transaction signature.
const SIGNATURE_SIZE: usize = 64;

/// Bytes in a message header.
const MESSAGE_HEADER_SIZE: usize = 3;

/// An ordered, mergeable set of instructions plus their required signers.
#[derive(Clone, Default)]
pub struct CombinableInstructions {
    signers: Vec<SharedSigner>,
    instructions: Vec<Instruction>,
}

impl CombinableInstructions {
    /// The identity unit: no signers, no instructions.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A unit that only contributes signers.
    pub fn from_signers(signers: Vec<SharedSigner>) -> Self {
        Self::default() + Self {
            signers,
            instructions: Vec::new(),
        }
    }

    /// A zero-instruction unit whose only signer is the wallet.
    ///
    /// Every submission combines with one of these; its signer pays fees.
    pub fn from_wallet(wallet: &Wallet) -> Self {
        Self {
            signers: vec![wallet.signer()],
            instructions: Vec::new(),
        }
    }

    /// A unit holding one instruction and no extra signers.
    pub fn from_instruction(instruction: Instruction) -> Self {
        Self::from_instructions(vec![instruction])
    }

    /// A unit holding `instructions` and no extra signers.
    pub fn from_instructions(instructions: Vec<Instruction>) -> Self {
        Self {
            signers: Vec::new(),
            instructions,
        }
    }

    /// Required signers, in first-seen order.
    pub fn signers(&self) -> &[SharedSigner] {
        &self.signers
    }

    /// Addresses of the required signers, in first-seen order.
    pub fn signer_addresses(&self) -> Vec<Pubkey> {
        self.signers.iter().map(|signer| signer.pubkey()).collect()
    }

    /// Instructions in submission order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// True if there are no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Submit every instruction, splitting across transactions only when the
    /// size limit forces it.
    ///
    /// Returns one signature per confirmed transaction. All transactions are
    /// built and signed before the first is submitted, so a missing signer
    /// fails before anything reaches the ledger. Each later transaction is
    /// re-signed against the ledger's latest blockhash just before it is
    /// submitted, so a long split does not outlive the first blockhash.
    /// Submission stops at the first failure.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if there is no fee payer, a single
    /// instruction exceeds the size limit, or a required signer is missing.
    /// Returns [`ClientError::Submission`] if the ledger rejects a
    /// transaction or cannot supply a blockhash for it; it lists the
    /// signatures already confirmed.
    pub fn execute(&self, context: &Context) -> Result<Vec<Signature>> {
        if self.is_empty() {
            info!("No instructions to run");
            return Ok(Vec::new());
        }
        let payer = self
            .signers
            .first()
            .map(|signer| signer.pubkey())
            .ok_or_else(|| ClientError::validation("no fee payer; combine with a wallet unit"))?;
        let chunks = self.chunks(&payer, context.config.max_transaction_size)?;
        let mut blockhash = context.ledger.latest_blockhash()?;
        let mut transactions = chunks
            .iter()
            .map(|range| self.sign(&payer, &self.instructions[range.clone()], blockhash))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "Submitting {} instructions in {} transaction(s)",
            self.len(),
            transactions.len()
        );
        let program_id = context.program_id();
        let mut completed = Vec::with_capacity(transactions.len());
        for (chunk_index, range) in chunks.iter().enumerate() {
            let failure = |completed: Vec<Signature>, source: LedgerError| {
                error!(
                    "Transaction {}/{} failed: {source}\n{}",
                    chunk_index + 1,
                    chunks.len(),
                    describe_instructions(&self.instructions[range.clone()], range.start, &program_id)
                );
                let (failed_instruction, error_code) = match &source {
                    LedgerError::Rejected {
                        instruction_index,
                        custom_code,
                        ..
                    } => (
                        instruction_index.map(|index| range.start + index),
                        custom_code.and_then(MangoErrorCode::from_u32),
                    ),
                    _ => (None, None),
                };
                ClientError::from(Box::new(SubmissionError {
                    chunk_index,
                    chunk_count: chunks.len(),
                    first_instruction: range.start,
                    instruction_count: range.len(),
                    failed_instruction,
                    error_code,
                    completed,
                    source,
                }))
            };

            if chunk_index > 0 {
                let latest = context
                    .ledger
                    .latest_blockhash()
                    .map_err(|source| failure(completed.clone(), source))?;
                if latest != blockhash {
                    debug!("Re-signing transaction {} for blockhash {latest}", chunk_index + 1);
                    blockhash = latest;
                    transactions[chunk_index] =
                        self.sign(&payer, &self.instructions[range.clone()], blockhash)?;
                }
            }

            match context.ledger.submit(&transactions[chunk_index]) {
                Ok(signature) => {
                    info!(
                        "Transaction {}/{} confirmed: {signature}",
                        chunk_index + 1,
                        chunks.len()
                    );
                    completed.push(signature);
                }
                Err(source) => return Err(failure(completed, source)),
            }
        }
        Ok(completed)
    }

    /// Greedy split into the fewest consecutive runs that fit `max_size`.
    fn chunks(&self, payer: &Pubkey, max_size: usize) -> Result<Vec<Range<usize>>> {
        let mut chunks = Vec::new();
        let mut start = 0;
        for end in 1..=self.instructions.len() {
            if transaction_size(payer, &self.instructions[start..end]) <= max_size {
                continue;
            }
            if end - start > 1 {
                chunks.push(start..end - 1);
                start = end - 1;
            }
            let size = transaction_size(payer, &self.instructions[start..end]);
            if size > max_size {
                return Err(ClientError::validation(format!(
                    "instruction {start} alone needs {size} bytes, limit is {max_size}"
                )));
            }
        }
        if start < self.instructions.len() {
            chunks.push(start..self.instructions.len());
        }
        Ok(chunks)
    }

    fn sign(&self, payer: &Pubkey, instructions: &[Instruction], blockhash: Hash) -> Result<Transaction> {
        let message = Message::new_with_blockhash(instructions, Some(payer), &blockhash);
        let required = usize::from(message.header.num_required_signatures);
        let signers = message.account_keys[..required]
            .iter()
            .map(|address| {
                self.signers
                    .iter()
                    .find(|signer| signer.pubkey() == *address)
                    .map(|signer| signer.as_ref() as &dyn Signer)
                    .ok_or_else(|| ClientError::validation(format!("missing signer {address}")))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut transaction = Transaction::new_unsigned(message);
        transaction
            .try_sign(signers.as_slice(), blockhash)
            .map_err(|err| ClientError::validation(format!("signing failed: {err}")))?;
        Ok(transaction)
    }
}

/// Serialized size of a legacy transaction carrying `instructions`.
pub fn transaction_size(payer: &Pubkey, instructions: &[Instruction]) -> usize {
    let message = Message::new(instructions, Some(payer));
    let signatures = usize::from(message.header.num_required_signatures);
    let keys = message.account_keys.len();

    let mut size = compact_len(signatures) + signatures * SIGNATURE_SIZE;
    size += MESSAGE_HEADER_SIZE;
    size += compact_len(keys) + keys * 32;
    size += 32;
    size += compact_len(message.instructions.len());
    for instruction in &message.instructions {
        size += 1;
        size += compact_len(instruction.accounts.len()) + instruction.accounts.len();
        size += compact_len(instruction.data.len()) + instruction.data.len();
    }
    size
}

/// Bytes taken by a compact-u16 length prefix.
fn compact_len(len: usize) -> usize {
    match len {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        _ => 3,
    }
}

impl Add for CombinableInstructions {
    type Output = Self;

    fn add(mut self, rhs: Self) -> Self {
        self += rhs;
        self
    }
}

impl AddAssign for CombinableInstructions {
    fn add_assign(&mut self, rhs: Self) {
        for signer in rhs.signers {
            let address = signer.pubkey();
            if !self.signers.iter().any(|known| known.pubkey() == address) {
                self.signers.push(signer);
            }
        }
        self.instructions.extend(rhs.instructions);
    }
}

impl Sum for CombinableInstructions {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::empty(), Add::add)
    }
}

impl PartialEq for CombinableInstructions {
    fn eq(&self, other: &Self) -> bool {
        self.signer_addresses() == other.signer_addresses()
            && self.instructions == other.instructions
    }
}

impl fmt::Debug for CombinableInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CombinableInstructions")
            .field("signers", &self.signer_addresses())
            .field("instructions", &self.instructions)
            .finish()
    }
}

impl fmt::Display for CombinableInstructions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Signers:")?;
        for address in self.signer_addresses() {
            writeln!(f, "  {address}")?;
        }
        writeln!(f, "Instructions:")?;
        let program_id = Pubkey::new_from_array(MANGO_PROGRAM_ID);
        write!(f, "{}", describe_instructions(&self.instructions, 0, &program_id))
    }
}
