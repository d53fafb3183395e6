//! Code skeletons handed to Morph as the `<update>` part of a request.
//!
//! Slots 1-4 have a JavaScript and a Python form; the rest are shared.

/// Skeleton for `slot` in `1..=10`. Any other slot yields the generic one.
pub fn update_pattern(slot: usize, language: &str) -> &'static str {
    let javascript = language.eq_ignore_ascii_case("javascript");
    match slot {
        1 if javascript => TWO_POINTERS_JS,
        1 => TWO_POINTERS_PY,
        2 if javascript => HASH_MAP_JS,
        2 => HASH_MAP_PY,
        3 if javascript => MEMOIZATION_JS,
        3 => MEMOIZATION_PY,
        4 if javascript => SLIDING_WINDOW_JS,
        4 => SLIDING_WINDOW_PY,
        5 => SORTING,
        6 => EARLY_TERMINATION,
        7 => LOOP_UNROLLING,
        8 => BIT_OPERATIONS,
        9 => DATA_STRUCTURE,
        10 => CACHE_BLOCKING,
        _ => GENERIC,
    }
}

const TWO_POINTERS_JS: &str = "// ... existing code ...
// Two pointers optimization for O(n) complexity
let left = 0, right = array.length - 1;
while (left < right) {
    // Process elements efficiently
    // ... existing code ...
}
// ... existing code ...";

const TWO_POINTERS_PY: &str = "# ... existing code ...
# Two pointers technique for linear time complexity
left, right = 0, len(arr) - 1
while left < right:
    # Process elements efficiently
    # ... existing code ...
# ... existing code ...";

const HASH_MAP_JS: &str = "// ... existing code ...
// Hash map for O(1) lookups instead of O(n) search
const lookup = new Map();
// Precompute for fast access
// ... existing code ...
// Use lookup.get() instead of linear search
// ... existing code ...";

const HASH_MAP_PY: &str = "# ... existing code ...
# Dictionary for O(1) lookups instead of O(n) search
lookup = {}
# Precompute for fast access
# ... existing code ...
# Use lookup.get() instead of linear search
# ... existing code ...";

const MEMOIZATION_JS: &str = "// ... existing code ...
// Memoization to cache expensive calculations
const memo = new Map();
function optimizedFunction(params) {
    if (memo.has(key)) return memo.get(key);
    // ... existing code ...
    memo.set(key, result);
    return result;
}
// ... existing code ...";

const MEMOIZATION_PY: &str = "# ... existing code ...
# Memoization decorator for caching
from functools import lru_cache

@lru_cache(maxsize=None)
def optimized_function(params):
    # ... existing code ...
    return result
# ... existing code ...";

const SLIDING_WINDOW_JS: &str = "// ... existing code ...
// Sliding window technique for subarray problems
let windowStart = 0, windowSum = 0;
for (let windowEnd = 0; windowEnd < array.length; windowEnd++) {
    windowSum += array[windowEnd];
    // ... existing code ...
    while (condition) {
        windowSum -= array[windowStart++];
    }
}
// ... existing code ...";

const SLIDING_WINDOW_PY: &str = "# ... existing code ...
# Sliding window technique for subarray problems
window_start, window_sum = 0, 0
for window_end in range(len(arr)):
    window_sum += arr[window_end]
    # ... existing code ...
    while condition:
        window_sum -= arr[window_start]
        window_start += 1
# ... existing code ...";

const SORTING: &str = "// ... existing code ...
// Sort-based approach to reduce complexity
// Replace O(n²) nested loops with O(n log n) sorting
// ... existing code ...
sortedData.forEach((item, index) => {
    // Process in sorted order for efficiency
    // ... existing code ...
});
// ... existing code ...";

const EARLY_TERMINATION: &str = "// ... existing code ...
// Early termination to avoid unnecessary computation
for (let i = 0; i < data.length; i++) {
    // ... existing code ...
    if (earlyExitCondition) {
        return result; // Exit early when possible
    }
    // ... existing code ...
}
// ... existing code ...";

const LOOP_UNROLLING: &str = "// ... existing code ...
// Loop unrolling for better performance
// Process multiple elements per iteration
for (let i = 0; i < data.length; i += 4) {
    // Process 4 elements at once
    // ... existing code ...
}
// ... existing code ...";

const BIT_OPERATIONS: &str = "// ... existing code ...
// Mathematical optimization using bit operations
// Replace expensive operations with bit shifts
const powerOfTwo = 1 << exponent; // Instead of Math.pow(2, exponent)
const modPowerOfTwo = value & (powerOfTwo - 1); // Instead of value % powerOfTwo
// ... existing code ...";

const DATA_STRUCTURE: &str = "// ... existing code ...
// Optimized data structure selection
const efficientSet = new Set(); // O(1) lookups instead of array
const priorityQueue = []; // Use appropriate data structure
// ... existing code ...";

const CACHE_BLOCKING: &str = "// ... existing code ...
// Cache-friendly memory access patterns
// Process data in blocks for better cache locality
const BLOCK_SIZE = 64; // Cache line size
for (let block = 0; block < data.length; block += BLOCK_SIZE) {
    // Process block efficiently
    // ... existing code ...
}
// ... existing code ...";

const GENERIC: &str = "// ... existing code ...
// Performance optimization applied
// Improved algorithmic approach
// ... existing code ...";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_specific_slots() {
        assert!(update_pattern(1, "JavaScript").contains("array.length - 1"));
        assert!(update_pattern(1, "python").contains("len(arr) - 1"));
        assert!(update_pattern(3, "python").contains("lru_cache"));
        assert_eq!(update_pattern(5, "python"), update_pattern(5, "javascript"));
    }

    #[test]
    fn out_of_range_slot_is_generic() {
        assert_eq!(update_pattern(0, "python"), GENERIC);
        assert_eq!(update_pattern(11, "python"), GENERIC);
    }
}
