#[cfg(test)]
pub const POST_DATA_MD: &str = "# What I learned after 20+ years of software development

How to be a great software engineer?

Someone asked me this question today and I didn’t have an answer. After thinking for a while, I came up with a list of what I try to do myself.

Disclaimer: I don't think I am a great engineer, but I would love to have listened to that myself when I started my career, over 20 years ago.

## Non technical

### Have a honest image of yourself

You finished university and learned a lot. You solved many hard problems.
It's common to think you are awesome and the smartest person in the planet.
Some day in your life, you will find that you are not. __The earlier you find that, the better.__
";

#[cfg(test)]
pub const MIXED_POST_MD: &str = "# Title

Opening paragraph with a footnote.[^1]

- item one
- item two

| a | b |
|---|---|
| 1 | 2 |

```rust
let x = 1;
```

> quoted text

![img](x.png)

<div>block html</div>

---

Closing words.

[^1]: The footnote text.
";
